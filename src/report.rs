// Fixed-layout text report
use anyhow::{Context, Result};
use chrono::Local;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::REPORT_SUFFIX;
use crate::types::{Analysis, DocumentAnalysis, FaultRecord, ProtectionDetection, PHASE_COUNT, TIME_SPAN, UNKNOWN};

pub const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

pub const TITLE: &str = "RÖLE ARIZA ANALİZ RAPORU";
pub const HEADER_GENERAL: &str = "📋 GENEL BİLGİLER:";
pub const HEADER_SUMMARY: &str = "⚡ ARIZA ÖZETİ:";
pub const HEADER_PROTECTIONS: &str = "🛡\u{fe0f} AKTİF KORUMA FONKSİYONLARI:";
pub const HEADER_SEQUENCE: &str = "📊 KORUMA SIRASI:";
pub const HEADER_RECOMMENDATIONS: &str = "💡 ÖNERİLER:";
pub const HEADER_SIGNAL: &str = "📈 SİNYAL ANALİZİ:";

pub const LABEL_DEVICE: &str = "• Cihaz Adı:";
pub const LABEL_FAULT_TIME: &str = "• Arıza Zamanı:";
pub const LABEL_CFG: &str = "• CFG Dosyası:";
pub const LABEL_SAMPLING: &str = "• Örnekleme Hızı:";
pub const LABEL_RECORD_TYPE: &str = "• Kayıt Türü:";
pub const LABEL_CAUSE: &str = "• Muhtemel Neden:";
pub const LABEL_DURATION: &str = "• Arıza Süresi:";
pub const LABEL_IL1_INSTANT: &str = "• IL1 Anlık Değer:";
pub const LABEL_IL1_RMS: &str = "• IL1 Etkin Değer:";
pub const LABEL_TIME_SPAN: &str = "• Zaman Aralığı:";
pub const LABEL_PHASES: &str = "• Faz Sayısı:";
pub const LABEL_GENERATED: &str = "Rapor Oluşturma Zamanı:";

const RULE_WIDTH: usize = 63;

fn heavy_rule() -> String {
    "═".repeat(RULE_WIDTH)
}

fn light_rule() -> String {
    "─".repeat(RULE_WIDTH)
}

fn or_unknown(value: &str) -> &str {
    if value.is_empty() {
        UNKNOWN
    } else {
        value
    }
}

/// Renders the report with the current local time in the footer.
pub fn generate_report(
    fault: &FaultRecord,
    detections: &[ProtectionDetection],
    analysis: &Analysis,
) -> String {
    let now = Local::now().format(TIMESTAMP_FORMAT).to_string();
    render_report(fault, detections, analysis, &now)
}

pub fn render_report(
    fault: &FaultRecord,
    detections: &[ProtectionDetection],
    analysis: &Analysis,
    generated_at: &str,
) -> String {
    let heavy = heavy_rule();
    let light = light_rule();
    let mut out = String::new();

    // writeln! into a String cannot fail
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", heavy);
    let _ = writeln!(out, "{:20}{}", "", TITLE);
    let _ = writeln!(out, "{}", heavy);
    let _ = writeln!(out);

    let _ = writeln!(out, "{}", HEADER_GENERAL);
    let _ = writeln!(out, "{}", light);
    let _ = writeln!(out, "{} {}", LABEL_DEVICE, or_unknown(&fault.device_name));
    let _ = writeln!(out, "{} {}", LABEL_FAULT_TIME, or_unknown(&fault.fault_time));
    let _ = writeln!(out, "{} {}", LABEL_CFG, or_unknown(&fault.cfg_file));
    let _ = writeln!(out, "{} {}", LABEL_SAMPLING, or_unknown(&fault.sampling_rate));
    let _ = writeln!(out, "{} {}", LABEL_RECORD_TYPE, or_unknown(&fault.record_type));
    let _ = writeln!(out);

    let _ = writeln!(out, "{}", HEADER_SUMMARY);
    let _ = writeln!(out, "{}", light);
    let _ = writeln!(out, "{} {}", LABEL_CAUSE, analysis.probable_cause);
    let _ = writeln!(out, "{} {}", LABEL_DURATION, analysis.fault_summary.duration);
    let _ = writeln!(out);

    let _ = write!(out, "{}\n{}", HEADER_PROTECTIONS, light);
    for (i, d) in detections.iter().enumerate() {
        let _ = write!(out, "\n{:>2}. {:<6} | {:<30} | {}", i + 1, d.code, d.description, d.status);
    }
    let _ = write!(out, "\n\n");

    let _ = write!(out, "{}\n{}", HEADER_SEQUENCE, light);
    for (i, entry) in analysis.protection_sequence.iter().enumerate() {
        let _ = write!(out, "\n{}. {:<15} | {}", i + 1, entry.action, entry.protection);
    }
    let _ = write!(out, "\n\n");

    let _ = write!(out, "{}\n{}", HEADER_RECOMMENDATIONS, light);
    for (i, rec) in analysis.recommendations.iter().enumerate() {
        let _ = write!(out, "\n{}. {}", i + 1, rec);
    }
    let _ = write!(out, "\n\n");

    let cursor = &fault.cursor_values;
    let _ = writeln!(out, "{}", HEADER_SIGNAL);
    let _ = writeln!(out, "{}", light);
    let _ = writeln!(out, "{} {} A", LABEL_IL1_INSTANT, cursor.il1_instant.as_deref().unwrap_or(UNKNOWN));
    let _ = writeln!(out, "{} {} A", LABEL_IL1_RMS, cursor.il1_rms.as_deref().unwrap_or(UNKNOWN));
    let _ = writeln!(out, "{} {}", LABEL_TIME_SPAN, TIME_SPAN);
    let _ = writeln!(out, "{} {}", LABEL_PHASES, PHASE_COUNT);
    let _ = writeln!(out);

    let _ = writeln!(out, "{}", heavy);
    let _ = writeln!(out, "{} {}", LABEL_GENERATED, generated_at);
    let _ = writeln!(out, "{}", heavy);

    out
}

pub fn report_path(output_dir: &Path, doc: &DocumentAnalysis) -> PathBuf {
    output_dir.join(format!("{}{}.txt", doc.document_name(), REPORT_SUFFIX))
}

/// Writes `<stem>_report.txt` (UTF-8) into `output_dir`.
pub fn save_report(output_dir: &Path, doc: &DocumentAnalysis, report: &str) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;
    let path = report_path(output_dir, doc);
    fs::write(&path, report).with_context(|| format!("writing {}", path.display()))?;
    log::info!("Report saved: {}", path.display());
    Ok(path)
}
