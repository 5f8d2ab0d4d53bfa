// Cause, sequence and recommendation derivation
use crate::types::{
    Analysis, FaultRecord, FaultSummary, ProtectionDetection, SequenceEntry, SequenceStage,
    FAULT_DURATION,
};

pub const CAUSE_SEPARATOR: &str = " | ";
pub const FALLBACK_CAUSE: &str = "Standart koruma fonksiyonu aktivasyonu";
pub const FALLBACK_RECOMMENDATION: &str = "Detaylı sistem analizi yapılmalı";

const BREAKER_OPEN_MARKER: &str = "KESICI ACIK";

/// A cause message fires when any classified detection carries one of `codes`.
pub struct CauseRule {
    pub codes: &'static [&'static str],
    pub message: &'static str,
}

pub const CAUSE_RULES: &[CauseRule] = &[
    CauseRule {
        codes: &["67", "67-1", "67-2"],
        message: "Yönlü aşırı akım - Muhtemelen hat arızası",
    },
    CauseRule {
        codes: &["67N", "67NIEF"],
        message: "Toprak arızası tespit edildi",
    },
    CauseRule {
        codes: &["50", "51"],
        message: "Aşırı akım koruması devreye girdi",
    },
    CauseRule {
        codes: &["59", "59G"],
        message: "Aşırı gerilim tespit edildi",
    },
    CauseRule {
        codes: &["27"],
        message: "Az gerilim tespit edildi",
    },
];

pub const BREAKER_OPEN_CAUSE: &str = "Kesici açıldı";

/// Lower-cased cause keyword → the recommendations it pulls in.
pub const RECOMMENDATION_RULES: &[(&str, [&str; 3])] = &[
    (
        "toprak arızası",
        [
            "Hat üzerinde toprak arızası kontrolü yapılmalı",
            "İzolasyon direnci ölçümü yapılmalı",
            "Topraklama sistemleri kontrol edilmeli",
        ],
    ),
    (
        "aşırı akım",
        [
            "Hat üzerinde kısa devre kontrolü yapılmalı",
            "Yük analizi yapılmalı",
            "Koruma ayarları gözden geçirilmeli",
        ],
    ),
    (
        "gerilim",
        [
            "Şebeke gerilim seviyesi kontrol edilmeli",
            "Transformatör çıkış gerilimleri ölçülmeli",
            "AVR sistemleri kontrol edilmeli",
        ],
    ),
];

/// Trip and pickup subsets. The two filters are independent, so an entry can
/// land in both or neither.
pub fn split_by_stage(
    detections: &[ProtectionDetection],
) -> (Vec<ProtectionDetection>, Vec<ProtectionDetection>) {
    let trips = detections.iter().filter(|d| d.is_trip()).cloned().collect();
    let pickups = detections.iter().filter(|d| d.is_pickup()).cloned().collect();
    (trips, pickups)
}

pub fn determine_fault_cause(
    trips: &[ProtectionDetection],
    pickups: &[ProtectionDetection],
    _fault: &FaultRecord,
) -> String {
    let codes: Vec<&str> = trips
        .iter()
        .chain(pickups.iter())
        .map(|d| d.code.as_str())
        .collect();

    let mut causes: Vec<&str> = CAUSE_RULES
        .iter()
        .filter(|rule| codes.iter().any(|code| rule.codes.contains(code)))
        .map(|rule| rule.message)
        .collect();

    if trips.iter().any(|d| mentions_breaker_open(d)) {
        causes.push(BREAKER_OPEN_CAUSE);
    }

    if causes.is_empty() {
        causes.push(FALLBACK_CAUSE);
    }

    causes.join(CAUSE_SEPARATOR)
}

fn mentions_breaker_open(detection: &ProtectionDetection) -> bool {
    [&detection.line, &detection.description, &detection.status]
        .iter()
        .any(|field| field.contains(BREAKER_OPEN_MARKER))
}

/// Every pickup before every trip, input order kept inside each group.
pub fn create_protection_sequence(
    trips: &[ProtectionDetection],
    pickups: &[ProtectionDetection],
) -> Vec<SequenceEntry> {
    let entry = |stage: SequenceStage, d: &ProtectionDetection| SequenceEntry {
        stage,
        action: stage.action().to_string(),
        protection: d.label(),
        status: d.status.clone(),
    };

    let mut sequence: Vec<SequenceEntry> = pickups
        .iter()
        .map(|d| entry(SequenceStage::Pickup, d))
        .chain(trips.iter().map(|d| entry(SequenceStage::Trip, d)))
        .collect();

    // stable
    sequence.sort_by_key(|e| e.stage.order());
    sequence
}

pub fn generate_recommendations(cause: &str) -> Vec<String> {
    let cause = cause.to_lowercase();

    let mut recommendations: Vec<String> = RECOMMENDATION_RULES
        .iter()
        .filter(|(keyword, _)| cause.contains(keyword))
        .flat_map(|(_, block)| block.iter().map(|r| r.to_string()))
        .collect();

    if recommendations.is_empty() {
        recommendations.push(FALLBACK_RECOMMENDATION.to_string());
    }
    recommendations
}

pub fn analyze_fault_sequence(fault: &FaultRecord, detections: &[ProtectionDetection]) -> Analysis {
    let (trips, pickups) = split_by_stage(detections);
    let probable_cause = determine_fault_cause(&trips, &pickups, fault);
    let protection_sequence = create_protection_sequence(&trips, &pickups);
    let recommendations = generate_recommendations(&probable_cause);

    log::debug!(
        "{} trips, {} pickups, cause: {}",
        trips.len(),
        pickups.len(),
        probable_cause
    );

    Analysis {
        fault_summary: FaultSummary {
            device: fault.device_name.clone(),
            time: fault.fault_time.clone(),
            duration: FAULT_DURATION.to_string(),
            sampling_rate: fault.sampling_rate.clone(),
        },
        probable_cause,
        protection_sequence,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(code: &str, status: &str) -> ProtectionDetection {
        ProtectionDetection {
            code: code.to_string(),
            description: crate::analysis::protection::description_for(code)
                .unwrap_or("?")
                .to_string(),
            status: status.to_string(),
            line: format!("{} {}", code, status),
        }
    }

    #[test]
    fn test_ground_fault_cause_and_recommendations() {
        let detections = vec![det("67N", "trip")];
        let analysis = analyze_fault_sequence(&FaultRecord::default(), &detections);

        assert!(analysis.probable_cause.contains("Toprak arızası tespit edildi"));
        assert_eq!(
            analysis.recommendations,
            vec![
                "Hat üzerinde toprak arızası kontrolü yapılmalı",
                "İzolasyon direnci ölçümü yapılmalı",
                "Topraklama sistemleri kontrol edilmeli",
            ]
        );
    }

    #[test]
    fn test_fallbacks_when_nothing_fires() {
        let detections = vec![det("46", "Tespit Edildi"), det("67", "Hazır")];
        let analysis = analyze_fault_sequence(&FaultRecord::default(), &detections);

        assert_eq!(analysis.probable_cause, FALLBACK_CAUSE);
        assert_eq!(analysis.recommendations, vec![FALLBACK_RECOMMENDATION]);
        assert!(analysis.protection_sequence.is_empty());
    }

    #[test]
    fn test_multiple_causes_joined_in_rule_order() {
        let trips = vec![det("51", "Açma"), det("67", "Açma")];
        let pickups = vec![det("27", "Başlama")];
        let cause = determine_fault_cause(&trips, &pickups, &FaultRecord::default());
        assert_eq!(
            cause,
            "Yönlü aşırı akım - Muhtemelen hat arızası | Aşırı akım koruması devreye girdi | Az gerilim tespit edildi"
        );
    }

    #[test]
    fn test_breaker_open_on_trip_line() {
        let mut trip = det("79", "Açma");
        trip.line = "79 KESICI ACIK ACMA".to_string();
        let cause = determine_fault_cause(&[trip], &[], &FaultRecord::default());
        assert_eq!(cause, BREAKER_OPEN_CAUSE);
    }

    #[test]
    fn test_overvoltage_cause_pulls_voltage_block_only() {
        let recs = generate_recommendations("Aşırı gerilim tespit edildi");
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0], "Şebeke gerilim seviyesi kontrol edilmeli");
    }

    #[test]
    fn test_directional_cause_pulls_overcurrent_block() {
        // "aşırı akım" appears inside the directional message
        let recs = generate_recommendations("Yönlü aşırı akım - Muhtemelen hat arızası");
        assert_eq!(recs[0], "Hat üzerinde kısa devre kontrolü yapılmalı");
        assert_eq!(recs.len(), 3);
    }

    #[test]
    fn test_sequence_pickups_then_trips() {
        let a = det("51", "Başlama");
        let b = det("67", "Başlama");
        let c = det("67N", "Açma");
        let seq = create_protection_sequence(&[c.clone()], &[a.clone(), b.clone()]);

        let got: Vec<_> = seq.iter().map(|e| (e.stage.order(), e.protection.clone())).collect();
        assert_eq!(got, vec![(1, a.label()), (1, b.label()), (2, c.label())]);
        assert_eq!(seq[0].action, "Başlama (Pick-up)");
        assert_eq!(seq[2].action, "Açma (Trip)");
    }

    #[test]
    fn test_sequence_ignores_source_interleaving() {
        let detections = vec![
            det("67N", "Açma"),
            det("51", "Başlama"),
            det("50", "Açma"),
            det("67", "Başlama"),
        ];
        let analysis = analyze_fault_sequence(&FaultRecord::default(), &detections);
        let stages: Vec<_> = analysis
            .protection_sequence
            .iter()
            .map(|e| e.stage)
            .collect();
        assert_eq!(
            stages,
            vec![
                SequenceStage::Pickup,
                SequenceStage::Pickup,
                SequenceStage::Trip,
                SequenceStage::Trip
            ]
        );
        assert!(analysis.protection_sequence[0].protection.starts_with("51 - "));
    }

    #[test]
    fn test_entry_in_both_subsets() {
        let both = det("59", "pick up / trip");
        let (trips, pickups) = split_by_stage(&[both]);
        assert_eq!((trips.len(), pickups.len()), (1, 1));
        assert_eq!(create_protection_sequence(&trips, &pickups).len(), 2);
    }

    #[test]
    fn test_summary_copies_record() {
        let fault = FaultRecord {
            device_name: "H10_FIDER_H".into(),
            sampling_rate: "1000 Hz".into(),
            ..FaultRecord::default()
        };
        let analysis = analyze_fault_sequence(&fault, &[]);
        assert_eq!(analysis.fault_summary.device, "H10_FIDER_H");
        assert_eq!(analysis.fault_summary.time, "");
        assert_eq!(analysis.fault_summary.sampling_rate, "1000 Hz");
        assert_eq!(analysis.fault_summary.duration, FAULT_DURATION);
    }
}
