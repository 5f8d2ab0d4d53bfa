// Core types for relay fault records
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// Placeholder used whenever a field was not found in the document
pub const UNKNOWN: &str = "Bilinmiyor";

// Fixed values the recorder reports never carry explicitly
pub const FAULT_DURATION: &str = "2 saniye (grafikten)";
pub const TIME_SPAN: &str = "0-2 saniye";
pub const PHASE_COUNT: &str = "3 (IL1, IL2, IL3)";

/// Cursor readings picked off the "Kürsör" line, kept as locale strings ("12,5").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorValues {
    pub il1_instant: Option<String>,
    pub il1_rms: Option<String>,
}

impl CursorValues {
    pub fn is_empty(&self) -> bool {
        self.il1_instant.is_none() && self.il1_rms.is_none()
    }
}

/// Everything field extraction could find in one document. Every field is
/// optional in practice; an empty string means the marker line never appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultRecord {
    pub device_name: String,
    pub fault_time: String,
    pub sampling_rate: String,
    pub cfg_file: String,
    pub file_path: String,
    pub record_type: String,
    pub cursor_values: CursorValues,
    pub active_protections: Vec<ProtectionDetection>,
}

/// One line of text where a protection code was spotted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionDetection {
    pub code: String,
    pub description: String,
    pub status: String,
    pub line: String,
}

impl ProtectionDetection {
    pub fn label(&self) -> String {
        format!("{} - {}", self.code, self.description)
    }

    pub fn is_trip(&self) -> bool {
        let status = self.status.to_lowercase();
        status.contains("trip") || status.contains("açma")
    }

    pub fn is_pickup(&self) -> bool {
        let status = self.status.to_lowercase();
        status.contains("pick up") || status.contains("başlama")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultSummary {
    pub device: String,
    pub time: String,
    pub duration: String,
    pub sampling_rate: String,
}

/// Pickups sort before trips; the tag is a labelling convention, not a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SequenceStage {
    Pickup = 1,
    Trip = 2,
}

impl SequenceStage {
    pub fn order(self) -> u8 {
        self as u8
    }

    pub fn action(self) -> &'static str {
        match self {
            SequenceStage::Pickup => "Başlama (Pick-up)",
            SequenceStage::Trip => "Açma (Trip)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceEntry {
    pub stage: SequenceStage,
    pub action: String,
    pub protection: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub fault_summary: FaultSummary,
    pub probable_cause: String,
    pub protection_sequence: Vec<SequenceEntry>,
    pub recommendations: Vec<String>,
}

/// Full result of running the pipeline over one document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentAnalysis {
    pub source: PathBuf,
    /// Names the report, chart and CSV rows; the file stem unless a batch
    /// had to disambiguate it.
    pub name: String,
    pub extracted_text: String,
    pub fault: FaultRecord,
    pub analysis: Analysis,
}

impl DocumentAnalysis {
    pub fn document_name(&self) -> String {
        self.name.clone()
    }

    pub fn detections(&self) -> &[ProtectionDetection] {
        &self.fault.active_protections
    }
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// Error types
#[derive(Debug, thiserror::Error)]
pub enum FaultError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("no text could be extracted from {}", .0.display())]
    NoText(PathBuf),

    #[error("required tool not available: {0}")]
    ToolMissing(String),

    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, FaultError>;
