// Configuration for relayfault
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::FaultError;

pub const CONFIG_ENV: &str = "RELAYFAULT_CONFIG";
pub const CONFIG_FILE: &str = "config.toml";

// Default input when `analyze` is run without a path
pub const DEFAULT_PDF: &str = "aa.pdf";

pub const REPORT_SUFFIX: &str = "_report";
pub const CHART_SUFFIX: &str = "_chart";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_pdftotext")]
    pub pdftotext: String,
    #[serde(default = "default_pdftoppm")]
    pub pdftoppm: String,
    #[serde(default = "default_tesseract")]
    pub tesseract: String,
    #[serde(default = "default_ocr_languages")]
    pub ocr_languages: String,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    #[serde(default = "default_true")]
    pub grayscale_before_ocr: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            pdftotext: default_pdftotext(),
            pdftoppm: default_pdftoppm(),
            tesseract: default_tesseract(),
            ocr_languages: default_ocr_languages(),
            dpi: default_dpi(),
            grayscale_before_ocr: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_csv_folder")]
    pub csv_folder: String,
    #[serde(default)]
    pub chart: bool,
    #[serde(default)]
    pub font_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_folder: default_csv_folder(),
            chart: false,
            font_path: String::new(),
        }
    }
}

fn default_pdftotext() -> String { "pdftotext".to_string() }
fn default_pdftoppm() -> String { "pdftoppm".to_string() }
fn default_tesseract() -> String { "tesseract".to_string() }
fn default_ocr_languages() -> String { "tur+eng".to_string() }
fn default_dpi() -> u32 { 300 }
fn default_true() -> bool { true }
fn default_csv_folder() -> String { "CSV_Data".to_string() }

impl AnalyzerConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg = toml::from_str(&content)
            .map_err(|e| FaultError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(cfg)
    }

    /// Explicit path first, then `$RELAYFAULT_CONFIG`, then the user config dir.
    /// Only an explicitly named file is allowed to fail the run.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        for candidate in implicit_locations() {
            if !candidate.exists() {
                continue;
            }
            match Self::from_file(&candidate) {
                Ok(cfg) => {
                    log::debug!("Loaded config from {}", candidate.display());
                    return Ok(cfg);
                }
                Err(e) => log::warn!("Ignoring config {}: {:#}", candidate.display(), e),
            }
        }

        Ok(Self::default())
    }

    pub fn csv_dir(&self, output_root: &Path) -> PathBuf {
        output_root.join(&self.output.csv_folder)
    }

    pub fn font_path(&self) -> Option<PathBuf> {
        if self.output.font_path.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.output.font_path))
        }
    }
}

fn implicit_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();
    if let Ok(path) = env::var(CONFIG_ENV) {
        locations.push(PathBuf::from(path));
    }
    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("relayfault").join(CONFIG_FILE));
    }
    locations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg: AnalyzerConfig = toml::from_str(
            r#"
            [extraction]
            dpi = 150

            [output]
            chart = true
            "#,
        )
        .unwrap();

        assert_eq!(cfg.extraction.dpi, 150);
        assert_eq!(cfg.extraction.ocr_languages, "tur+eng");
        assert_eq!(cfg.extraction.pdftotext, "pdftotext");
        assert!(cfg.extraction.grayscale_before_ocr);
        assert!(cfg.output.chart);
        assert_eq!(cfg.output.csv_folder, "CSV_Data");
        assert!(cfg.font_path().is_none());
    }

    #[test]
    fn test_empty_file_is_default() {
        let cfg: AnalyzerConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.extraction.dpi, 300);
        assert!(!cfg.output.chart);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let missing = Path::new("/definitely/not/here/relayfault.toml");
        assert!(AnalyzerConfig::load(Some(missing)).is_err());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"[extraction]\ndpi = \"yuksek\"\n").unwrap();

        let err = AnalyzerConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err.downcast_ref::<FaultError>(), Some(FaultError::Config(_))));
    }

    #[test]
    fn test_csv_dir_joins_folder_name() {
        let cfg = AnalyzerConfig::default();
        assert_eq!(cfg.csv_dir(Path::new("/out")), PathBuf::from("/out/CSV_Data"));
    }
}
