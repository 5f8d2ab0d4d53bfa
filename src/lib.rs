// relayfault - protective relay fault record analysis
pub mod analysis;
pub mod chart;
pub mod config;
pub mod csv_export;
pub mod pdf_extraction;
pub mod pipeline;
pub mod report;
pub mod txt_import;
pub mod types;

pub use config::AnalyzerConfig;
pub use pipeline::FaultAnalyzer;
pub use types::{DocumentAnalysis, FaultError, FaultRecord, ProtectionDetection};
