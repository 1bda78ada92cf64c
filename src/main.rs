//! Stratified K-fold cross-validation of a post-operative risk model.

use std::path::PathBuf;

use riskfold::app_dirs;
use riskfold::config::{self, ClassifierKind, CvConfig};
use riskfold::cv;
use riskfold::dataset::{self, Target};
use riskfold::logging::{self, LogOptions};
use riskfold::ml::MetricsEngine;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if wants_help(&args) {
        println!("{}", help_text());
        return Ok(());
    }
    let options = parse_args(args)?;
    if let Err(err) = logging::init(LogOptions {
        verbose: options.verbose,
        to_file: !options.no_log_file,
    }) {
        eprintln!("Logging disabled: {err}");
    }

    let mut config = match &options.config_path {
        Some(path) => config::load_config(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())?;
    options.apply(&mut config);
    config.validate().map_err(|err| err.to_string())?;
    if let Some(path) = &options.write_config {
        config::save_config(path, &config).map_err(|err| err.to_string())?;
        println!("Config written to {}", path.display());
    }

    let records = dataset::load_patients(&options.dataset_path).map_err(|err| err.to_string())?;
    let dataset =
        dataset::encode_patients(&records, config.target).map_err(|err| err.to_string())?;
    tracing::info!(
        samples = dataset.len(),
        positives = dataset.positives(),
        negatives = dataset.negatives(),
        outcome = %config.target,
        "Loaded {}",
        options.dataset_path.display()
    );

    let engine = MetricsEngine::new(config.threshold).map_err(|err| err.to_string())?;
    let classifier = config.classifier.clone();
    let folds = cv::run(
        &dataset,
        config.folds,
        config.seed,
        || classifier.build(),
        &engine,
    )
    .map_err(|err| err.to_string())?;
    let aggregated = cv::aggregate(&folds).map_err(|err| err.to_string())?;
    let report = cv::assemble(config.snapshot(), dataset.summary(), folds, aggregated);
    print!("{}", cv::render_summary(&report));

    let out_path = match options.out_path {
        Some(path) => path,
        None => app_dirs::reports_dir()
            .map_err(|err| err.to_string())?
            .join(format!("cv_{}.json", report.run_id)),
    };
    cv::write_report(&out_path, &report).map_err(|err| err.to_string())?;
    println!("Report written to {}", out_path.display());
    Ok(())
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    dataset_path: PathBuf,
    config_path: Option<PathBuf>,
    out_path: Option<PathBuf>,
    write_config: Option<PathBuf>,
    folds: Option<usize>,
    seed: Option<u64>,
    target: Option<Target>,
    classifier: Option<ClassifierKind>,
    verbose: bool,
    no_log_file: bool,
}

impl CliOptions {
    /// Flags take precedence over the config file.
    fn apply(&self, config: &mut CvConfig) {
        if let Some(folds) = self.folds {
            config.folds = folds;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(target) = self.target {
            config.target = target;
        }
        if let Some(kind) = self.classifier {
            config.classifier.kind = kind;
        }
    }
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut dataset_path: Option<PathBuf> = None;

    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        match flag {
            "-v" | "--verbose" => options.verbose = true,
            "--no-log-file" => options.no_log_file = true,
            "--dataset" => {
                idx += 1;
                dataset_path = Some(PathBuf::from(value(&args, idx, flag)?));
            }
            "--config" => {
                idx += 1;
                options.config_path = Some(PathBuf::from(value(&args, idx, flag)?));
            }
            "--out" => {
                idx += 1;
                options.out_path = Some(PathBuf::from(value(&args, idx, flag)?));
            }
            "--write-config" => {
                idx += 1;
                options.write_config = Some(PathBuf::from(value(&args, idx, flag)?));
            }
            "--folds" => {
                idx += 1;
                let value = value(&args, idx, flag)?;
                options.folds = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --folds value: {value}"))?,
                );
            }
            "--seed" => {
                idx += 1;
                let value = value(&args, idx, flag)?;
                options.seed = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("Invalid --seed value: {value}"))?,
                );
            }
            "--target" => {
                idx += 1;
                options.target = Some(value(&args, idx, flag)?.parse::<Target>()?);
            }
            "--classifier" => {
                idx += 1;
                options.classifier = Some(value(&args, idx, flag)?.parse::<ClassifierKind>()?);
            }
            unknown => {
                return Err(format!("Unknown argument: {unknown}\n\n{}", help_text()));
            }
        }
        idx += 1;
    }

    options.dataset_path = dataset_path.ok_or_else(|| {
        format!("Missing required --dataset <patients.json>\n\n{}", help_text())
    })?;
    Ok(options)
}

fn value<'a>(args: &'a [String], idx: usize, flag: &str) -> Result<&'a str, String> {
    args.get(idx)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

/// Help goes to stdout and exits cleanly, unlike argument errors.
fn wants_help(args: &[String]) -> bool {
    args.iter().any(|arg| arg == "-h" || arg == "--help")
}

fn help_text() -> String {
    [
        "riskfold",
        "",
        "Stratified K-fold cross-validation of a binary post-operative risk model.",
        "",
        "Usage:",
        "  riskfold --dataset <patients.json> [options]",
        "",
        "Options:",
        "  --config <path>         TOML config (default: riskfold.toml in the app directory).",
        "  --folds <k>             Number of folds (default 5).",
        "  --seed <n>              Fold shuffle seed (default 42).",
        "  --target <name>         complications | mortality (default complications).",
        "  --classifier <kind>     logreg | mlp (default mlp).",
        "  --out <path>            Report path (default: reports/cv_<run id>.json in the app directory).",
        "  --write-config <path>   Save the effective configuration as TOML.",
        "  --no-log-file           Log to stderr only.",
        "  -v, --verbose           Debug-level logging.",
    ]
    .join("\n")
}
