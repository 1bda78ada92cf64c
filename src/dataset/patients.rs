//! Gastrectomy patient records as stored in cohort JSON files.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::DatasetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

/// TNM stage group, serialized as `IA` through `IV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TumorStage {
    Ia,
    Ib,
    Iia,
    Iib,
    Iiia,
    Iiib,
    Iv,
}

impl TumorStage {
    pub const ALL: [TumorStage; 7] = [
        TumorStage::Ia,
        TumorStage::Ib,
        TumorStage::Iia,
        TumorStage::Iib,
        TumorStage::Iiia,
        TumorStage::Iiib,
        TumorStage::Iv,
    ];

    /// 1 for `IA` up to 7 for `IV`.
    pub fn ordinal(self) -> u8 {
        self as u8 + 1
    }

    pub fn is_early(self) -> bool {
        matches!(self, TumorStage::Ia | TumorStage::Ib | TumorStage::Iia)
    }

    /// Stage III and IV.
    pub fn is_advanced(self) -> bool {
        matches!(self, TumorStage::Iiia | TumorStage::Iiib | TumorStage::Iv)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TumorLocation {
    Antrum,
    Body,
    Cardia,
    Fundus,
}

impl TumorLocation {
    pub const ALL: [TumorLocation; 4] = [
        TumorLocation::Antrum,
        TumorLocation::Body,
        TumorLocation::Cardia,
        TumorLocation::Fundus,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurgeryType {
    Laparoscopic,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalStatus {
    Alive,
    Deceased,
}

/// One patient as exported by the cohort generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub patient_id: String,
    pub age: u32,
    pub sex: Sex,
    pub bmi: f64,
    pub tumor_stage: TumorStage,
    pub tumor_location: TumorLocation,
    pub surgery_type: SurgeryType,
    pub operation_time_min: u32,
    pub blood_loss_ml: u32,
    pub complications: bool,
    pub hospital_stay_days: u32,
    pub neoadjuvant_therapy: bool,
    pub lymph_nodes_removed: u32,
    pub survival_months: u32,
    pub status: VitalStatus,
}

impl PatientRecord {
    /// Range checks on the numeric fields.
    pub fn validate(&self) -> Result<(), DatasetError> {
        let invalid = |field: &'static str, reason: String| DatasetError::InvalidRecord {
            patient_id: self.patient_id.clone(),
            field,
            reason,
        };
        if self.patient_id.trim().is_empty() {
            return Err(invalid("patient_id", "empty identifier".to_string()));
        }
        if !(18..=110).contains(&self.age) {
            return Err(invalid("age", format!("{} outside 18..=110", self.age)));
        }
        if !self.bmi.is_finite() || !(10.0..=70.0).contains(&self.bmi) {
            return Err(invalid("bmi", format!("{} outside 10..=70", self.bmi)));
        }
        if self.operation_time_min == 0 {
            return Err(invalid("operation_time_min", "must be positive".to_string()));
        }
        if self.hospital_stay_days == 0 {
            return Err(invalid("hospital_stay_days", "must be positive".to_string()));
        }
        Ok(())
    }
}

/// Read and validate a JSON array of patient records.
pub fn load_patients(path: &Path) -> Result<Vec<PatientRecord>, DatasetError> {
    let bytes = std::fs::read(path).map_err(|source| DatasetError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let records: Vec<PatientRecord> =
        serde_json::from_slice(&bytes).map_err(|source| DatasetError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    if records.is_empty() {
        return Err(DatasetError::Empty);
    }
    for record in &records {
        record.validate()?;
    }
    tracing::debug!("Loaded {} patient records from {}", records.len(), path.display());
    Ok(records)
}

/// Write records as a pretty-printed JSON array, creating parent directories.
pub fn save_patients(path: &Path, records: &[PatientRecord]) -> Result<(), DatasetError> {
    let write_err = |source| DatasetError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let bytes = serde_json::to_vec_pretty(records).map_err(|source| DatasetError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, bytes).map_err(write_err)
}
