// OCR fallback: rasterise pages with pdftoppm, read them back with tesseract
use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::extraction_router::{ExtractionMethod, TextExtractor};
use super::tools::{command_exists, run_tool};
use crate::config::ExtractionConfig;

pub struct OcrExtractor {
    pdftoppm: String,
    tesseract: String,
    languages: String,
    dpi: u32,
    grayscale: bool,
}

impl OcrExtractor {
    pub fn new(cfg: &ExtractionConfig) -> Self {
        Self {
            pdftoppm: cfg.pdftoppm.clone(),
            tesseract: cfg.tesseract.clone(),
            languages: cfg.ocr_languages.clone(),
            dpi: cfg.dpi,
            grayscale: cfg.grayscale_before_ocr,
        }
    }

    /// Renders every page to `<dir>/page-N.png` and returns them in page order.
    pub fn render_pages(&self, pdf_path: &Path, dir: &Path) -> Result<Vec<PathBuf>> {
        let prefix = dir.join("page");
        let dpi = self.dpi.to_string();

        run_tool(
            &self.pdftoppm,
            [
                OsStr::new("-r"),
                OsStr::new(&dpi),
                OsStr::new("-png"),
                pdf_path.as_os_str(),
                prefix.as_os_str(),
            ],
        )?;

        let mut pages: Vec<(usize, PathBuf)> = fs::read_dir(dir)
            .with_context(|| format!("listing {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter_map(|path| rendered_page_number(&path).map(|n| (n, path)))
            .collect();
        pages.sort_by_key(|(n, _)| *n);

        log::debug!("pdftoppm rendered {} pages at {} dpi", pages.len(), self.dpi);
        Ok(pages.into_iter().map(|(_, path)| path).collect())
    }

    pub fn recognize(&self, image_path: &Path) -> Result<String> {
        if self.grayscale {
            let gray = image::open(image_path)
                .with_context(|| format!("opening {}", image_path.display()))?
                .to_luma8();
            gray.save(image_path)
                .with_context(|| format!("writing {}", image_path.display()))?;
        }

        let stdout = run_tool(
            &self.tesseract,
            [
                image_path.as_os_str(),
                OsStr::new("stdout"),
                OsStr::new("-l"),
                OsStr::new(&self.languages),
            ],
        )?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

impl TextExtractor for OcrExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Ocr
    }

    fn is_available(&self) -> bool {
        command_exists(&self.pdftoppm) && command_exists(&self.tesseract)
    }

    fn extract_pages(&self, pdf_path: &Path) -> Result<Vec<String>> {
        log::info!("Rendering pages and running OCR ({})...", self.languages);
        let temp_dir = TempDir::new()?;
        let images = self.render_pages(pdf_path, temp_dir.path())?;

        images.iter().map(|image| self.recognize(image)).collect()
    }
}

// pdftoppm names pages "page-1.png" or zero-padded "page-01.png"
fn rendered_page_number(path: &Path) -> Option<usize> {
    if path.extension().and_then(OsStr::to_str) != Some("png") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.rsplit_once('-')?.1.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_page_number() {
        assert_eq!(rendered_page_number(Path::new("/tmp/x/page-1.png")), Some(1));
        assert_eq!(rendered_page_number(Path::new("/tmp/x/page-012.png")), Some(12));
        assert_eq!(rendered_page_number(Path::new("/tmp/x/page-1.ppm")), None);
        assert_eq!(rendered_page_number(Path::new("/tmp/x/notes.png")), None);
    }

    #[test]
    fn test_uses_configured_languages() {
        let cfg = ExtractionConfig {
            ocr_languages: "eng".into(),
            dpi: 150,
            ..ExtractionConfig::default()
        };
        let ocr = OcrExtractor::new(&cfg);
        assert_eq!(ocr.languages, "eng");
        assert_eq!(ocr.dpi, 150);
        assert_eq!(ocr.method(), ExtractionMethod::Ocr);
    }
}
