// Flat CSV tables for spreadsheet tools
use chrono::Local;
use indexmap::IndexMap;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::report::TIMESTAMP_FORMAT;
use crate::types::{DocumentAnalysis, Result};

pub const MAIN_FILE: &str = "Ana_Ariza_Bilgileri.csv";
pub const PROTECTIONS_FILE: &str = "Koruma_Fonksiyonlari.csv";
pub const RECOMMENDATIONS_FILE: &str = "Oneriler.csv";
pub const STATISTICS_FILE: &str = "Istatistikler.csv";
pub const COMBINED_FILE: &str = "Detayli_Kombine_Analiz.csv";

// Excel only detects UTF-8 with a signature
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const MAIN_HEADERS: [&str; 10] = [
    "Dosya_Adi",
    "Cihaz_Adi",
    "Ariza_Zamani",
    "CFG_Dosyasi",
    "Ornekleme_Hizi",
    "Kayit_Turu",
    "Muhtemel_Neden",
    "Ariza_Suresi",
    "IL1_Anlik_Deger",
    "IL1_Etkin_Deger",
];

const COMBINED_HEADERS: [&str; 4] = [
    "Koruma_Kodu",
    "Koruma_Aciklamasi",
    "Koruma_Durumu",
    "Koruma_Detay",
];

/// One row per document. The two columns before `Analiz_Zamani` differ
/// between a live analysis (counts) and an imported report (time span, phases).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MainRow {
    pub document: String,
    pub device: String,
    pub fault_time: String,
    pub cfg_file: String,
    pub sampling_rate: String,
    pub record_type: String,
    pub probable_cause: String,
    pub duration: String,
    pub il1_instant: String,
    pub il1_rms: String,
    pub extra: Vec<(&'static str, String)>,
    pub analysed_at: String,
}

impl MainRow {
    pub fn from_analysis(doc: &DocumentAnalysis, analysed_at: &str) -> Self {
        let fault = &doc.fault;
        Self {
            document: doc.document_name(),
            device: fault.device_name.clone(),
            fault_time: fault.fault_time.clone(),
            cfg_file: fault.cfg_file.clone(),
            sampling_rate: fault.sampling_rate.clone(),
            record_type: fault.record_type.clone(),
            probable_cause: doc.analysis.probable_cause.clone(),
            duration: doc.analysis.fault_summary.duration.clone(),
            il1_instant: fault.cursor_values.il1_instant.clone().unwrap_or_default(),
            il1_rms: fault.cursor_values.il1_rms.clone().unwrap_or_default(),
            extra: vec![
                ("Aktif_Koruma_Sayisi", doc.detections().len().to_string()),
                ("Oneri_Sayisi", doc.analysis.recommendations.len().to_string()),
            ],
            analysed_at: analysed_at.to_string(),
        }
    }

    pub fn headers(&self) -> Vec<&'static str> {
        let mut headers = MAIN_HEADERS.to_vec();
        headers.extend(self.extra.iter().map(|(name, _)| *name));
        headers.push("Analiz_Zamani");
        headers
    }

    pub fn values(&self) -> Vec<String> {
        let mut values = vec![
            self.document.clone(),
            self.device.clone(),
            self.fault_time.clone(),
            self.cfg_file.clone(),
            self.sampling_rate.clone(),
            self.record_type.clone(),
            self.probable_cause.clone(),
            self.duration.clone(),
            self.il1_instant.clone(),
            self.il1_rms.clone(),
        ];
        values.extend(self.extra.iter().map(|(_, v)| v.clone()));
        values.push(self.analysed_at.clone());
        values
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtectionRow {
    #[serde(rename = "Dosya_Adi")]
    pub document: String,
    #[serde(rename = "Koruma_Sira_No")]
    pub index: usize,
    #[serde(rename = "Koruma_Kodu")]
    pub code: String,
    #[serde(rename = "Koruma_Aciklamasi")]
    pub description: String,
    #[serde(rename = "Koruma_Durumu")]
    pub status: String,
    #[serde(rename = "Koruma_Detay_Satiri")]
    pub line: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecommendationRow {
    #[serde(rename = "Dosya_Adi")]
    pub document: String,
    #[serde(rename = "Oneri_Sira_No")]
    pub index: usize,
    #[serde(rename = "Oneri_Metni")]
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatCategory {
    #[serde(rename = "Koruma_Fonksiyonu")]
    Protection,
    #[serde(rename = "Cihaz")]
    Device,
    #[serde(rename = "Ariza_Nedeni")]
    Cause,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatRow {
    #[serde(rename = "Kategori")]
    pub category: StatCategory,
    #[serde(rename = "Adi")]
    pub name: String,
    #[serde(rename = "Sayi")]
    pub count: usize,
    #[serde(rename = "Yuzde")]
    pub percent: f64,
}

/// Main row left-joined to its protections. A document without detections
/// still yields exactly one row, with the protection columns empty.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedRow {
    pub main: MainRow,
    pub code: String,
    pub description: String,
    pub status: String,
    pub detail: String,
}

impl CombinedRow {
    pub fn values(&self) -> Vec<String> {
        let mut values = self.main.values();
        values.extend([
            self.code.clone(),
            self.description.clone(),
            self.status.clone(),
            self.detail.clone(),
        ]);
        values
    }
}

/// Every row produced for one document, kept together so the combined
/// table never joins on the document name.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRows {
    pub main: MainRow,
    pub protections: Vec<ProtectionRow>,
    pub recommendations: Vec<RecommendationRow>,
}

impl DocumentRows {
    pub fn from_analysis(doc: &DocumentAnalysis, analysed_at: &str) -> Self {
        let name = doc.document_name();

        let protections = doc
            .detections()
            .iter()
            .enumerate()
            .map(|(i, d)| ProtectionRow {
                document: name.clone(),
                index: i + 1,
                code: d.code.clone(),
                description: d.description.clone(),
                status: d.status.clone(),
                line: d.line.clone(),
            })
            .collect();

        let recommendations = doc
            .analysis
            .recommendations
            .iter()
            .enumerate()
            .map(|(i, text)| RecommendationRow {
                document: name.clone(),
                index: i + 1,
                text: text.clone(),
            })
            .collect();

        Self {
            main: MainRow::from_analysis(doc, analysed_at),
            protections,
            recommendations,
        }
    }

    fn combined(&self) -> Vec<CombinedRow> {
        if self.protections.is_empty() {
            return vec![CombinedRow {
                main: self.main.clone(),
                code: String::new(),
                description: String::new(),
                status: String::new(),
                detail: String::new(),
            }];
        }

        self.protections
            .iter()
            .map(|p| CombinedRow {
                main: self.main.clone(),
                code: p.code.clone(),
                description: p.description.clone(),
                status: p.status.clone(),
                detail: p.line.clone(),
            })
            .collect()
    }
}

/// Rows accumulated over a run, flattened to files once at the end.
#[derive(Debug, Default)]
pub struct ExportBatch {
    pub documents: Vec<DocumentRows>,
}

impl ExportBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn push(&mut self, rows: DocumentRows) {
        self.documents.push(rows);
    }

    pub fn push_document(&mut self, doc: &DocumentAnalysis) {
        let analysed_at = Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.push_document_at(doc, &analysed_at);
    }

    pub fn push_document_at(&mut self, doc: &DocumentAnalysis, analysed_at: &str) {
        self.push(DocumentRows::from_analysis(doc, analysed_at));
    }

    pub fn mains(&self) -> impl Iterator<Item = &MainRow> {
        self.documents.iter().map(|d| &d.main)
    }

    pub fn protections(&self) -> impl Iterator<Item = &ProtectionRow> {
        self.documents.iter().flat_map(|d| d.protections.iter())
    }

    pub fn recommendations(&self) -> impl Iterator<Item = &RecommendationRow> {
        self.documents.iter().flat_map(|d| d.recommendations.iter())
    }

    pub fn combined_rows(&self) -> Vec<CombinedRow> {
        self.documents.iter().flat_map(DocumentRows::combined).collect()
    }

    /// Counts per protection code, device and cause, as a share of documents.
    pub fn statistics(&self) -> Vec<StatRow> {
        let total = self.len();

        let mut codes: IndexMap<&str, usize> = IndexMap::new();
        for p in self.protections() {
            *codes.entry(p.code.as_str()).or_default() += 1;
        }
        let mut devices: IndexMap<&str, usize> = IndexMap::new();
        let mut causes: IndexMap<&str, usize> = IndexMap::new();
        for main in self.mains() {
            *devices.entry(main.device.as_str()).or_default() += 1;
            *causes.entry(main.probable_cause.as_str()).or_default() += 1;
        }

        [
            (StatCategory::Protection, codes),
            (StatCategory::Device, devices),
            (StatCategory::Cause, causes),
        ]
        .into_iter()
        .flat_map(|(category, counts)| {
            counts.into_iter().map(move |(name, count)| StatRow {
                category,
                name: name.to_string(),
                count,
                percent: percentage(count, total),
            })
        })
        .collect()
    }

    /// Writes every table into `csv_dir`. Files are written one after the
    /// other; a failure leaves the ones already written in place.
    pub fn save(&self, csv_dir: &Path) -> Result<Vec<PathBuf>> {
        if self.is_empty() {
            log::warn!("No rows to export");
            return Ok(Vec::new());
        }

        if !csv_dir.exists() {
            fs::create_dir_all(csv_dir)?;
            log::info!("Created CSV folder: {}", csv_dir.display());
        }

        let mut written = Vec::new();
        let headers = self.documents[0].main.headers();

        let path = csv_dir.join(MAIN_FILE);
        write_records(&path, &headers, self.mains().map(MainRow::values))?;
        written.push(path);

        let protections: Vec<_> = self.protections().collect();
        if !protections.is_empty() {
            let path = csv_dir.join(PROTECTIONS_FILE);
            write_serialized(&path, &protections)?;
            written.push(path);
        }

        let recommendations: Vec<_> = self.recommendations().collect();
        if !recommendations.is_empty() {
            let path = csv_dir.join(RECOMMENDATIONS_FILE);
            write_serialized(&path, &recommendations)?;
            written.push(path);
        }

        let path = csv_dir.join(COMBINED_FILE);
        let mut combined_headers = headers;
        combined_headers.extend(COMBINED_HEADERS);
        write_records(
            &path,
            &combined_headers,
            self.combined_rows().iter().map(CombinedRow::values),
        )?;
        written.push(path);

        let path = csv_dir.join(STATISTICS_FILE);
        write_serialized(&path, &self.statistics())?;
        written.push(path);

        for path in &written {
            log::info!("CSV saved: {}", path.display());
        }
        Ok(written)
    }
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = count as f64 / total as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

fn create_with_bom(path: &Path) -> Result<File> {
    let mut file = File::create(path)?;
    file.write_all(UTF8_BOM)?;
    Ok(file)
}

fn write_records<I>(path: &Path, headers: &[&str], rows: I) -> Result<()>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::Writer::from_writer(create_with_bom(path)?);
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    // Check for error rather than implicitly flushing and ignoring.
    writer.flush()?;
    Ok(())
}

fn write_serialized<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(create_with_bom(path)?);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
