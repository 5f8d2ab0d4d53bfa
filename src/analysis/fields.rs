// Field extraction: one pass over the normalized lines, first match per field wins
use crate::types::{CursorValues, FaultRecord};
use regex::Regex;

lazy_static::lazy_static! {
    static ref FAULT_TIME_RE: Regex =
        Regex::new(r"(\d{1,2}\.\d{1,2}\.\d{4} \d{2}:\d{2}:\d{2})").unwrap();
    static ref SAMPLING_RATE_RE: Regex = Regex::new(r"(\d+) Hz").unwrap();
    static ref CURSOR_RE: Regex = Regex::new(r"IL1 A (\d+,\d+) A (\d+,\d+) A").unwrap();
}

// Device names the recorder prints verbatim in its header
pub const DEVICE_MARKERS: &[&str] = &["H10_FIDER_H"];

const FAULT_TIME_MARKER: &str = "Start zamanı:";
const SAMPLING_RATE_MARKER: &str = "Örnekleme hızı:";
const CFG_MARKER: &str = ".CFG";
const FILE_PATH_MARKER: &str = "Dosya yolu:";
const RECORD_TYPE_MARKER: &str = "Kayıt türü:";
const CURSOR_MARKER: &str = "Kürsör";

/// A value recognised on a single line, tagged with the field it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Device(String),
    FaultTime(String),
    SamplingRate(String),
    CfgFile(String),
    FilePath(String),
    RecordType(String),
    Cursor { instant: String, rms: String },
}

type Matcher = fn(&str) -> Option<FieldValue>;

// Evaluated in this order for every line
const MATCHERS: &[(&str, Matcher)] = &[
    ("device", match_device),
    ("fault_time", match_fault_time),
    ("sampling_rate", match_sampling_rate),
    ("cfg_file", match_cfg_file),
    ("file_path", match_file_path),
    ("record_type", match_record_type),
    ("cursor", match_cursor),
];

fn match_device(line: &str) -> Option<FieldValue> {
    DEVICE_MARKERS
        .iter()
        .find(|marker| line.contains(*marker))
        .map(|marker| FieldValue::Device(marker.to_string()))
}

fn match_fault_time(line: &str) -> Option<FieldValue> {
    if !line.contains(FAULT_TIME_MARKER) {
        return None;
    }
    FAULT_TIME_RE
        .captures(line)
        .map(|caps| FieldValue::FaultTime(caps[1].to_string()))
}

fn match_sampling_rate(line: &str) -> Option<FieldValue> {
    if !line.contains(SAMPLING_RATE_MARKER) {
        return None;
    }
    SAMPLING_RATE_RE
        .captures(line)
        .map(|caps| FieldValue::SamplingRate(format!("{} Hz", &caps[1])))
}

fn match_cfg_file(line: &str) -> Option<FieldValue> {
    if line.contains(CFG_MARKER) && !line.contains("Dosya yolu") {
        Some(FieldValue::CfgFile(line.trim().to_string()))
    } else {
        None
    }
}

fn match_file_path(line: &str) -> Option<FieldValue> {
    labelled_value(line, FILE_PATH_MARKER).map(FieldValue::FilePath)
}

fn match_record_type(line: &str) -> Option<FieldValue> {
    labelled_value(line, RECORD_TYPE_MARKER).map(FieldValue::RecordType)
}

fn match_cursor(line: &str) -> Option<FieldValue> {
    if !(line.contains(CURSOR_MARKER) && line.contains("IL1")) {
        return None;
    }
    CURSOR_RE.captures(line).map(|caps| FieldValue::Cursor {
        instant: caps[1].to_string(),
        rms: caps[2].to_string(),
    })
}

// "Label: value" anywhere in the line; the label is removed, the rest trimmed
fn labelled_value(line: &str, label: &str) -> Option<String> {
    if line.contains(label) {
        Some(line.replace(label, "").trim().to_string())
    } else {
        None
    }
}

fn fill(slot: &mut String, value: String) {
    if slot.is_empty() {
        *slot = value;
    }
}

impl FaultRecord {
    /// Stores `value` unless its field already holds something.
    pub fn apply_first(&mut self, value: FieldValue) {
        match value {
            FieldValue::Device(v) => fill(&mut self.device_name, v),
            FieldValue::FaultTime(v) => fill(&mut self.fault_time, v),
            FieldValue::SamplingRate(v) => fill(&mut self.sampling_rate, v),
            FieldValue::CfgFile(v) => fill(&mut self.cfg_file, v),
            FieldValue::FilePath(v) => fill(&mut self.file_path, v),
            FieldValue::RecordType(v) => fill(&mut self.record_type, v),
            FieldValue::Cursor { instant, rms } => {
                if self.cursor_values.is_empty() {
                    self.cursor_values = CursorValues {
                        il1_instant: Some(instant),
                        il1_rms: Some(rms),
                    };
                }
            }
        }
    }
}

/// Every value any matcher recognises on `line`, in matcher order.
pub fn match_line(line: &str) -> Vec<FieldValue> {
    MATCHERS
        .iter()
        .filter_map(|(name, matcher)| {
            let value = matcher(line)?;
            log::trace!("{} matched {:?}", name, value);
            Some(value)
        })
        .collect()
}

/// Builds a [`FaultRecord`] from normalized text. Total over any input; fields
/// that never match stay empty.
pub fn extract_fault_info(text: &str) -> FaultRecord {
    let mut record = FaultRecord::default();

    for line in text.split('\n') {
        let line = line.trim();
        for value in match_line(line) {
            record.apply_first(value);
        }
    }

    log::debug!(
        "Fields: device={:?} time={:?} rate={:?} cfg={:?}",
        record.device_name,
        record.fault_time,
        record.sampling_rate,
        record.cfg_file
    );
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
SIGRA H10_FIDER_H
Start zamanı: 14.3.2024 09:41:07,512
Örnekleme hızı: 1000 Hz
H10_FIDER_H_2024.CFG
Dosya yolu: C:\\Kayit\\H10_FIDER_H_2024.CFG
Kayıt türü: Arıza kaydı
Kürsör 1 IL1 A 412,35 A 288,10 A";

    #[test]
    fn test_full_record() {
        let record = extract_fault_info(SAMPLE);
        assert_eq!(record.device_name, "H10_FIDER_H");
        assert_eq!(record.fault_time, "14.3.2024 09:41:07");
        assert_eq!(record.sampling_rate, "1000 Hz");
        assert_eq!(record.cfg_file, "H10_FIDER_H_2024.CFG");
        assert_eq!(record.file_path, "C:\\Kayit\\H10_FIDER_H_2024.CFG");
        assert_eq!(record.record_type, "Arıza kaydı");
        assert_eq!(record.cursor_values.il1_instant.as_deref(), Some("412,35"));
        assert_eq!(record.cursor_values.il1_rms.as_deref(), Some("288,10"));
        assert!(record.active_protections.is_empty());
    }

    #[test]
    fn test_sampling_rate_line() {
        let record = extract_fault_info("Örnekleme hızı: 1000 Hz");
        assert_eq!(record.sampling_rate, "1000 Hz");
    }

    #[test]
    fn test_first_match_wins() {
        let text = "\
Start zamanı: 1.2.2023 00:00:01
Start zamanı: 9.9.2029 23:59:59
Örnekleme hızı: 1000 Hz
Örnekleme hızı: 2000 Hz
Kürsör IL1 A 1,0 A 2,0 A
Kürsör IL1 A 3,0 A 4,0 A";
        let record = extract_fault_info(text);
        assert_eq!(record.fault_time, "1.2.2023 00:00:01");
        assert_eq!(record.sampling_rate, "1000 Hz");
        assert_eq!(record.cursor_values.il1_instant.as_deref(), Some("1,0"));
        assert_eq!(record.cursor_values.il1_rms.as_deref(), Some("2,0"));
    }

    #[test]
    fn test_marker_without_value_leaves_field_open() {
        let text = "Start zamanı: bilinmiyor\nStart zamanı: 5.6.2024 12:00:00";
        assert_eq!(extract_fault_info(text).fault_time, "5.6.2024 12:00:00");
    }

    #[test]
    fn test_path_line_is_not_a_cfg_line() {
        let record = extract_fault_info("Dosya yolu: D:\\A.CFG");
        assert_eq!(record.cfg_file, "");
        assert_eq!(record.file_path, "D:\\A.CFG");
    }

    #[test]
    fn test_cursor_needs_marker_word() {
        let record = extract_fault_info("IL1 A 1,0 A 2,0 A");
        assert!(record.cursor_values.is_empty());
    }

    #[test]
    fn test_unrelated_text_gives_default() {
        assert_eq!(extract_fault_info("lorem ipsum\n\n67N"), FaultRecord::default());
        assert_eq!(extract_fault_info(""), FaultRecord::default());
    }

    #[test]
    fn test_match_line_reports_every_field_on_line() {
        let values = match_line("H10_FIDER_H Örnekleme hızı: 500 Hz");
        assert_eq!(
            values,
            vec![
                FieldValue::Device("H10_FIDER_H".into()),
                FieldValue::SamplingRate("500 Hz".into()),
            ]
        );
    }

    #[test]
    fn test_matchers_run_in_field_order() {
        let names: Vec<_> = MATCHERS.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec!["device", "fault_time", "sampling_rate", "cfg_file", "file_path", "record_type", "cursor"]
        );
    }
}
