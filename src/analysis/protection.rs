// Protection code detection against the fixed ANSI code table
use crate::types::ProtectionDetection;

/// ANSI device code → Turkish description, in scan order.
pub const PROTECTION_CODES: &[(&str, &str)] = &[
    ("46", "Faz Sırası/Negatif Sıra Koruma"),
    ("46D", "Faz Sırası Koruma - Açma"),
    ("47O-", "Gerilim Düşük Koruma"),
    ("47U+", "Gerilim Yüksek Koruma"),
    ("49F", "Termal Koruma"),
    ("50", "Ani Akım Koruma"),
    ("51", "Zaman Aşırı Akım Koruma"),
    ("50N", "Ani Toprak Koruma"),
    ("51N", "Zaman Aşırı Toprak Koruma"),
    ("59", "Aşırı Gerilim Koruma"),
    ("59G", "Toprak Aşırı Gerilim Koruma"),
    ("60", "Gerilim/Frekans Dengesizlik"),
    ("67", "Yönlü Aşırı Akım Koruma"),
    ("67N", "Yönlü Toprak Koruma"),
    ("67NIEF", "Yönlü Toprak Koruma (İnternal)"),
    ("27", "Az Gerilim Koruma"),
    ("79", "Otomatik Kapama/Açma"),
    ("68", "Blok Koruma"),
];

/// Keyword (matched upper-cased) → status label, first hit wins.
pub const STATUS_KEYWORDS: &[(&str, &str)] = &[
    ("pick up", "Başlama"),
    ("trip", "Açma"),
    ("OPER", "Çalışma"),
    ("ACMA", "Açma"),
    ("KAPALI", "Kapalı"),
    ("ACIK", "Açık"),
    ("AKTIF", "Aktif"),
    ("HAZIR", "Hazır"),
];

pub const STATUS_DETECTED: &str = "Tespit Edildi";

pub fn description_for(code: &str) -> Option<&'static str> {
    PROTECTION_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, description)| *description)
}

pub fn check_protection_status(line: &str) -> &'static str {
    let upper = line.to_uppercase();
    STATUS_KEYWORDS
        .iter()
        .find(|(keyword, _)| upper.contains(&keyword.to_uppercase()))
        .map(|(_, status)| *status)
        .unwrap_or(STATUS_DETECTED)
}

/// One detection per (line, code) pair where the code occurs as a plain
/// substring. No token boundaries and no de-duplication: "50N" on a line
/// also yields a "50" detection.
pub fn identify_protection_functions(text: &str) -> Vec<ProtectionDetection> {
    let mut detections = Vec::new();

    for line in text.split('\n') {
        for (code, description) in PROTECTION_CODES {
            if line.contains(code) {
                detections.push(ProtectionDetection {
                    code: code.to_string(),
                    description: description.to_string(),
                    status: check_protection_status(line).to_string(),
                    line: line.trim().to_string(),
                });
            }
        }
    }

    log::debug!("Detected {} protection lines", detections.len());
    detections
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tables_have_unique_keys() {
        assert_eq!(PROTECTION_CODES.len(), 18);
        assert_eq!(STATUS_KEYWORDS.len(), 8);
        let codes: HashSet<_> = PROTECTION_CODES.iter().map(|(c, _)| *c).collect();
        assert_eq!(codes.len(), PROTECTION_CODES.len());
        let keys: HashSet<_> = STATUS_KEYWORDS.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys.len(), STATUS_KEYWORDS.len());
    }

    #[test]
    fn test_description_lookup() {
        assert_eq!(description_for("67NIEF"), Some("Yönlü Toprak Koruma (İnternal)"));
        assert_eq!(description_for("99"), None);
    }

    #[test]
    fn test_status_resolution() {
        assert_eq!(check_protection_status("67 Trip L1"), "Açma");
        assert_eq!(check_protection_status("51N pick up"), "Başlama");
        assert_eq!(check_protection_status("79 oper"), "Çalışma");
        assert_eq!(check_protection_status("KESICI ACIK"), "Açık");
        assert_eq!(check_protection_status("46 ----"), STATUS_DETECTED);
    }

    #[test]
    fn test_status_first_keyword_in_table_order() {
        // "ACMA" and "ACIK" both present; ACMA comes first in the table
        assert_eq!(check_protection_status("ACIK ACMA"), "Açma");
    }

    #[test]
    fn test_substring_collisions_are_kept() {
        let found = identify_protection_functions("50N ACMA");
        let codes: Vec<_> = found.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["50", "50N"]);
        assert!(found.iter().all(|d| d.status == "Açma"));
        assert!(found.iter().all(|d| d.line == "50N ACMA"));
    }

    #[test]
    fn test_order_is_line_then_table() {
        let text = "67N trip\n27 HAZIR\n67N trip";
        let found = identify_protection_functions(text);
        let codes: Vec<_> = found.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["67", "67N", "27", "67", "67N"]);
        assert_eq!(found[2].status, "Hazır");
    }

    #[test]
    fn test_no_codes() {
        assert!(identify_protection_functions("Kayıt türü: Arıza").is_empty());
    }
}
