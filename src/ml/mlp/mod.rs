//! Single-hidden-layer MLP risk classifier.

mod model;
mod train;

pub use model::{MlpClassifier, MlpModel};
pub use train::{TrainOptions, train_mlp};
