// Reads saved `*_report.txt` files back into the CSV tables
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::REPORT_SUFFIX;
use crate::csv_export::{DocumentRows, ExportBatch, MainRow, ProtectionRow, RecommendationRow};
use crate::report::{
    HEADER_PROTECTIONS, HEADER_RECOMMENDATIONS, HEADER_SEQUENCE, HEADER_SIGNAL, LABEL_CAUSE,
    LABEL_CFG, LABEL_DEVICE, LABEL_DURATION, LABEL_FAULT_TIME, LABEL_GENERATED, LABEL_IL1_INSTANT,
    LABEL_IL1_RMS, LABEL_PHASES, LABEL_RECORD_TYPE, LABEL_SAMPLING, LABEL_TIME_SPAN,
};
use crate::types::{Result, UNKNOWN};

lazy_static! {
    static ref PROTECTION_ROW_RE: Regex =
        Regex::new(r"^(\d+)\.\s+(\w+)\s*\|\s*([^|]+?)\s*\|\s*(.+)").unwrap();
    static ref RECOMMENDATION_ROW_RE: Regex = Regex::new(r"^(\d+)\.\s*(.+)").unwrap();
}

// Any run of the heavy rule closes the recommendation list
const HEAVY_RULE_MARK: &str = "═══════════";
const LIGHT_RULE_CHAR: char = '─';

/// Document id for `<id>_report.txt`.
pub fn document_id(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.replace(REPORT_SUFFIX, "")
}

/// Everything recovered from one report file.
pub fn parse_report(content: &str, document: &str) -> DocumentRows {
    DocumentRows {
        main: parse_main_info(content, document),
        protections: parse_protections(content, document),
        recommendations: parse_recommendations(content, document),
    }
}

pub fn parse_main_info(content: &str, document: &str) -> MainRow {
    let mut row = MainRow {
        document: document.to_string(),
        ..MainRow::default()
    };
    let mut time_span = String::new();
    let mut phases = String::new();

    for line in content.split('\n').map(str::trim) {
        let slot = if line.starts_with(LABEL_DEVICE) {
            Some((&mut row.device, LABEL_DEVICE))
        } else if line.starts_with(LABEL_FAULT_TIME) {
            Some((&mut row.fault_time, LABEL_FAULT_TIME))
        } else if line.starts_with(LABEL_CFG) {
            Some((&mut row.cfg_file, LABEL_CFG))
        } else if line.starts_with(LABEL_SAMPLING) {
            Some((&mut row.sampling_rate, LABEL_SAMPLING))
        } else if line.starts_with(LABEL_RECORD_TYPE) {
            Some((&mut row.record_type, LABEL_RECORD_TYPE))
        } else if line.starts_with(LABEL_CAUSE) {
            Some((&mut row.probable_cause, LABEL_CAUSE))
        } else if line.starts_with(LABEL_DURATION) {
            Some((&mut row.duration, LABEL_DURATION))
        } else if line.starts_with(LABEL_IL1_INSTANT) {
            Some((&mut row.il1_instant, LABEL_IL1_INSTANT))
        } else if line.starts_with(LABEL_IL1_RMS) {
            Some((&mut row.il1_rms, LABEL_IL1_RMS))
        } else if line.starts_with(LABEL_TIME_SPAN) {
            Some((&mut time_span, LABEL_TIME_SPAN))
        } else if line.starts_with(LABEL_PHASES) {
            Some((&mut phases, LABEL_PHASES))
        } else if line.starts_with(LABEL_GENERATED) {
            Some((&mut row.analysed_at, LABEL_GENERATED))
        } else {
            None
        };

        if let Some((field, label)) = slot {
            *field = known(line[label.len()..].trim()).to_string();
        }
    }

    row.extra = vec![("Zaman_Araligi", time_span), ("Faz_Sayisi", phases)];
    row
}

// The report prints empty fields as UNKNOWN; the live export leaves them empty
fn known(value: &str) -> &str {
    let unit_less = value.strip_suffix(" A").unwrap_or(value);
    if value == UNKNOWN || unit_less == UNKNOWN {
        ""
    } else {
        value
    }
}

pub fn parse_protections(content: &str, document: &str) -> Vec<ProtectionRow> {
    let mut rows = Vec::new();
    let mut in_section = false;

    for line in content.split('\n').map(str::trim) {
        if line.contains(HEADER_PROTECTIONS) {
            in_section = true;
            continue;
        }
        if !in_section {
            continue;
        }
        if line.contains(HEADER_SEQUENCE) || line.contains(HEADER_RECOMMENDATIONS) {
            in_section = false;
            continue;
        }
        if line.is_empty() || line.starts_with(LIGHT_RULE_CHAR) {
            continue;
        }

        if let Some(caps) = PROTECTION_ROW_RE.captures(line) {
            rows.push(ProtectionRow {
                document: document.to_string(),
                index: rows.len() + 1,
                code: caps[2].trim().to_string(),
                description: caps[3].trim().to_string(),
                status: caps[4].trim().to_string(),
                line: line.to_string(),
            });
        }
    }

    rows
}

pub fn parse_recommendations(content: &str, document: &str) -> Vec<RecommendationRow> {
    let mut rows = Vec::new();
    let mut in_section = false;

    for line in content.split('\n').map(str::trim) {
        if line.contains(HEADER_RECOMMENDATIONS) {
            in_section = true;
            continue;
        }
        if !in_section {
            continue;
        }
        if line.contains(HEADER_SIGNAL) || line.contains(HEAVY_RULE_MARK) {
            in_section = false;
            continue;
        }
        if line.is_empty() || line.starts_with(LIGHT_RULE_CHAR) {
            continue;
        }

        if let Some(caps) = RECOMMENDATION_ROW_RE.captures(line) {
            rows.push(RecommendationRow {
                document: document.to_string(),
                index: rows.len() + 1,
                text: caps[2].trim().to_string(),
            });
        }
    }

    rows
}

/// Sorted `*_report.txt` files directly under `folder`.
pub fn find_reports(folder: &Path) -> Result<Vec<PathBuf>> {
    let suffix = format!("{}.txt", REPORT_SUFFIX);
    let mut files: Vec<PathBuf> = fs::read_dir(folder)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.ends_with(&suffix))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Parses every report in `input_folder` and writes the CSV tables into
/// `csv_dir`. Unreadable files are skipped.
pub fn convert_reports(input_folder: &Path, csv_dir: &Path) -> Result<Vec<PathBuf>> {
    if !input_folder.is_dir() {
        log::error!("Input folder not found: {}", input_folder.display());
        return Ok(Vec::new());
    }

    let files = find_reports(input_folder)?;
    if files.is_empty() {
        log::error!("No *{}.txt files in {}", REPORT_SUFFIX, input_folder.display());
        return Ok(Vec::new());
    }
    log::info!("Found {} report files, converting...", files.len());

    let mut batch = ExportBatch::new();
    for path in &files {
        log::info!("Processing {}", path.display());
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                log::error!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        batch.push(parse_report(&content, &document_id(path)));
    }

    batch.save(csv_dir)
}
