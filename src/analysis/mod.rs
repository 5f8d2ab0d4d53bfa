// Extraction-and-classification core: text in, fault record and analysis out
pub mod cause;
pub mod fields;
pub mod normalize;
pub mod protection;

pub use cause::analyze_fault_sequence;
pub use fields::extract_fault_info;
pub use normalize::clean_extracted_text;
pub use protection::identify_protection_functions;

use crate::types::{Analysis, FaultRecord};

/// Runs normalization, field extraction, detection and analysis over raw text.
/// Returns the normalized text alongside the results.
pub fn analyze_text(raw_text: &str) -> (String, FaultRecord, Analysis) {
    let cleaned = clean_extracted_text(raw_text);
    let mut fault = extract_fault_info(&cleaned);
    let detections = identify_protection_functions(&cleaned);
    let analysis = analyze_fault_sequence(&fault, &detections);
    fault.active_protections = detections;
    (cleaned, fault, analysis)
}
