//! Turns patient records into a standardized numeric feature matrix.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use super::patients::{PatientRecord, Sex, SurgeryType, TumorLocation, VitalStatus};
use super::{Dataset, DatasetError};

/// Column order of the encoded matrix.
pub const FEATURE_NAMES: [&str; 13] = [
    "age",
    "bmi",
    "operation_time_min",
    "blood_loss_ml",
    "lymph_nodes_removed",
    "sex_male",
    "tumor_stage",
    "surgery_open",
    "neoadjuvant_therapy",
    "location_antrum",
    "location_body",
    "location_cardia",
    "location_fundus",
];

/// Outcome predicted by the risk model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Any post-operative complication.
    #[default]
    Complications,
    /// Deceased at last follow-up.
    Mortality,
}

impl Target {
    pub fn as_str(self) -> &'static str {
        match self {
            Target::Complications => "complications",
            Target::Mortality => "mortality",
        }
    }

    fn label(self, record: &PatientRecord) -> u8 {
        let positive = match self {
            Target::Complications => record.complications,
            Target::Mortality => record.status == VitalStatus::Deceased,
        };
        u8::from(positive)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "complications" => Ok(Target::Complications),
            "mortality" => Ok(Target::Mortality),
            other => Err(format!(
                "Unknown target {other} (expected complications or mortality)"
            )),
        }
    }
}

/// Encode `records` for `target` and z-score every column.
///
/// Post-operative fields (hospital stay, survival time and whichever outcome
/// is not the target) are left out so the features only describe what is
/// known before and during surgery.
///
/// Column statistics come from the whole cohort, so folds built afterwards
/// share one normalization; held-out rows contribute to the mean and std seen
/// by the training rows.
pub fn encode_patients(records: &[PatientRecord], target: Target) -> Result<Dataset, DatasetError> {
    if records.is_empty() {
        return Err(DatasetError::Empty);
    }
    let mut features = Array2::<f64>::zeros((records.len(), FEATURE_NAMES.len()));
    let mut labels = Vec::with_capacity(records.len());
    for (mut row, record) in features.rows_mut().into_iter().zip(records) {
        record.validate()?;
        row[0] = f64::from(record.age);
        row[1] = record.bmi;
        row[2] = f64::from(record.operation_time_min);
        row[3] = f64::from(record.blood_loss_ml);
        row[4] = f64::from(record.lymph_nodes_removed);
        row[5] = flag(record.sex == Sex::Male);
        row[6] = f64::from(record.tumor_stage.ordinal());
        row[7] = flag(record.surgery_type == SurgeryType::Open);
        row[8] = flag(record.neoadjuvant_therapy);
        for (offset, location) in TumorLocation::ALL.iter().enumerate() {
            row[9 + offset] = flag(record.tumor_location == *location);
        }
        labels.push(target.label(record));
    }
    standardize(&mut features);

    let names = FEATURE_NAMES.iter().map(|name| name.to_string()).collect();
    Dataset::new(features, labels)?.with_feature_names(names)
}

fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

/// Centre each column and divide by its population standard deviation.
/// Constant columns are only centred.
fn standardize(features: &mut Array2<f64>) {
    let Some(mean) = features.mean_axis(Axis(0)) else {
        return;
    };
    let std = features.std_axis(Axis(0), 0.0);
    for mut row in features.rows_mut() {
        for ((value, &m), &s) in row.iter_mut().zip(&mean).zip(&std) {
            let scale = if s > 1e-12 { s } else { 1.0 };
            *value = (*value - m) / scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::patients::TumorStage;

    fn patient(id: usize, complications: bool, status: VitalStatus) -> PatientRecord {
        PatientRecord {
            patient_id: format!("T{id:03}"),
            age: 50 + id as u32,
            sex: if id % 2 == 0 { Sex::Male } else { Sex::Female },
            bmi: 20.0 + id as f64,
            tumor_stage: TumorStage::ALL[id % TumorStage::ALL.len()],
            tumor_location: TumorLocation::ALL[id % TumorLocation::ALL.len()],
            surgery_type: SurgeryType::Open,
            operation_time_min: 200,
            blood_loss_ml: 300 + 10 * id as u32,
            complications,
            hospital_stay_days: 10,
            neoadjuvant_therapy: id % 3 == 0,
            lymph_nodes_removed: 30,
            survival_months: 40,
            status,
        }
    }

    #[test]
    fn labels_follow_the_target() {
        let records = vec![
            patient(0, true, VitalStatus::Alive),
            patient(1, false, VitalStatus::Deceased),
            patient(2, false, VitalStatus::Alive),
        ];
        let complications = encode_patients(&records, Target::Complications).unwrap();
        let mortality = encode_patients(&records, Target::Mortality).unwrap();
        assert_eq!(complications.labels(), &[1, 0, 0]);
        assert_eq!(mortality.labels(), &[0, 1, 0]);
        assert_eq!(complications.feature_len(), FEATURE_NAMES.len());
        assert_eq!(complications.feature_names()[6], "tumor_stage");
    }

    #[test]
    fn columns_are_standardized_and_constants_centred() {
        let records: Vec<_> = (0..8)
            .map(|i| patient(i, i % 2 == 0, VitalStatus::Alive))
            .collect();
        let dataset = encode_patients(&records, Target::Complications).unwrap();
        let features = dataset.features();
        let means = features.mean_axis(Axis(0)).unwrap();
        let stds = features.std_axis(Axis(0), 0.0);
        for (column, (&m, &s)) in means.iter().zip(stds.iter()).enumerate() {
            assert!(m.abs() < 1e-9, "column {column} mean {m}");
            // Columns 2, 4 and 7 are constant in this cohort.
            if column == 2 || column == 4 || column == 7 {
                assert_eq!(s, 0.0);
            } else {
                assert!((s - 1.0).abs() < 1e-9, "column {column} std {s}");
            }
        }
    }

    #[test]
    fn parses_target_names() {
        assert_eq!("Mortality".parse::<Target>().unwrap(), Target::Mortality);
        assert!("survival".parse::<Target>().is_err());
    }
}
