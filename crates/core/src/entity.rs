use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog identifier of a measurement site (e.g. "hyytiala").
pub type SiteId = String;
/// Catalog identifier of a data product (e.g. "radar", "model", "classification").
pub type ProductId = String;
/// Catalog identifier of a specific instrument (instrument-sourced products only).
pub type InstrumentId = String;
/// Catalog identifier of a forecast model variant (model-sourced products only).
pub type ModelId = String;
/// Groups tasks submitted together so they can be cancelled as a unit.
pub type BatchId = Uuid;
/// Calendar day a measurement file covers.
pub type MeasurementDate = chrono::NaiveDate;

/// The kind of processing a task performs.
///
/// The queue only sequences these; the actual work (netCDF generation,
/// plotting, QC, export) happens in whichever worker claims the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Process,
    Freeze,
    Plot,
    Qc,
    Export,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Process => "process",
            TaskType::Freeze => "freeze",
            TaskType::Plot => "plot",
            TaskType::Qc => "qc",
            TaskType::Export => "export",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown task type: {0}")]
pub struct UnknownTaskType(pub String);

impl std::str::FromStr for TaskType {
    type Err = UnknownTaskType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "process" => Ok(TaskType::Process),
            "freeze" => Ok(TaskType::Freeze),
            "plot" => Ok(TaskType::Plot),
            "qc" => Ok(TaskType::Qc),
            "export" => Ok(TaskType::Export),
            other => Err(UnknownTaskType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn task_type_roundtrips_through_str() {
        for t in [
            TaskType::Process,
            TaskType::Freeze,
            TaskType::Plot,
            TaskType::Qc,
            TaskType::Export,
        ] {
            assert_eq!(TaskType::from_str(t.as_str()).unwrap(), t);
        }
        assert!(TaskType::from_str("reprocess").is_err());
    }

    #[test]
    fn task_type_serializes_lowercase() {
        let json = serde_json::to_string(&TaskType::Freeze).unwrap();
        assert_eq!(json, "\"freeze\"");
    }
}
