// Text acquisition with an ordered fallback chain
//
// Methods are tried in priority order:
//   1. pdftotext -layout        (highest fidelity text layer)
//   2. lopdf content streams    (pure Rust, no external tools)
//   3. pdftoppm + tesseract OCR (scanned reports)
//
// Each attempt is isolated: an error is logged and counts as "no text".
// The first method that yields non-blank text wins.

use std::fmt;
use std::path::Path;
use std::time::Instant;

use super::ocr_engine::OcrExtractor;
use super::text_layer::{LopdfExtractor, PdfToTextExtractor};
use crate::analysis::normalize::page_marker;
use crate::config::ExtractionConfig;
use crate::types::{FaultError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    PdfToText,
    Lopdf,
    Ocr,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtractionMethod::PdfToText => "pdftotext",
            ExtractionMethod::Lopdf => "lopdf",
            ExtractionMethod::Ocr => "OCR",
        };
        f.write_str(name)
    }
}

/// One way of getting page text out of a PDF.
pub trait TextExtractor {
    fn method(&self) -> ExtractionMethod;

    /// Whether the tools this method needs are installed.
    fn is_available(&self) -> bool;

    /// Text of every page, in page order.
    fn extract_pages(&self, pdf_path: &Path) -> anyhow::Result<Vec<String>>;
}

#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub text: String,
    pub method: ExtractionMethod,
    pub page_count: usize,
    pub extraction_time_ms: u64,
}

pub struct ExtractionRouter {
    extractors: Vec<Box<dyn TextExtractor>>,
}

impl ExtractionRouter {
    /// Standard chain; methods whose tools are missing are left out.
    pub fn from_config(cfg: &ExtractionConfig) -> Self {
        let candidates: Vec<Box<dyn TextExtractor>> = vec![
            Box::new(PdfToTextExtractor::new(cfg.pdftotext.clone())),
            Box::new(LopdfExtractor),
            Box::new(OcrExtractor::new(cfg)),
        ];

        let extractors = candidates
            .into_iter()
            .filter(|extractor| {
                let available = extractor.is_available();
                if !available {
                    log::warn!("{} is not installed, skipping that method", extractor.method());
                }
                available
            })
            .collect();

        Self { extractors }
    }

    /// Chain as given, no availability probing.
    pub fn with_extractors(extractors: Vec<Box<dyn TextExtractor>>) -> Self {
        Self { extractors }
    }

    pub fn methods(&self) -> Vec<ExtractionMethod> {
        self.extractors.iter().map(|e| e.method()).collect()
    }

    pub fn extract(&self, pdf_path: &Path) -> Result<ExtractionResult> {
        if !pdf_path.exists() {
            return Err(FaultError::NotFound(pdf_path.to_path_buf()));
        }

        for extractor in &self.extractors {
            let method = extractor.method();
            let start = Instant::now();

            let pages = match extractor.extract_pages(pdf_path) {
                Ok(pages) => pages,
                Err(e) => {
                    log::warn!("{} failed on {}: {:#}", method, pdf_path.display(), e);
                    continue;
                }
            };

            // Markers are added per page, so blankness is judged before joining
            if pages.iter().all(|page| page.trim().is_empty()) {
                log::debug!("{} produced no text for {}", method, pdf_path.display());
                continue;
            }
            let text = join_pages(&pages, method == ExtractionMethod::Ocr);

            log::info!("Extracted {} pages with {}", pages.len(), method);
            return Ok(ExtractionResult {
                text,
                method,
                page_count: pages.len(),
                extraction_time_ms: start.elapsed().as_millis() as u64,
            });
        }

        log::error!("No method could extract text from {}", pdf_path.display());
        Err(FaultError::NoText(pdf_path.to_path_buf()))
    }
}

fn join_pages(pages: &[String], ocr: bool) -> String {
    pages
        .iter()
        .enumerate()
        .map(|(i, page)| format!("{}{}", page_marker(i + 1, ocr), page))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Fake {
        method: ExtractionMethod,
        result: std::result::Result<Vec<&'static str>, &'static str>,
        calls: Rc<Cell<usize>>,
    }

    impl TextExtractor for Fake {
        fn method(&self) -> ExtractionMethod {
            self.method
        }

        fn is_available(&self) -> bool {
            true
        }

        fn extract_pages(&self, _pdf_path: &Path) -> anyhow::Result<Vec<String>> {
            self.calls.set(self.calls.get() + 1);
            match &self.result {
                Ok(pages) => Ok(pages.iter().map(|p| p.to_string()).collect()),
                Err(msg) => Err(anyhow::anyhow!(*msg)),
            }
        }
    }

    fn fake(
        method: ExtractionMethod,
        result: std::result::Result<Vec<&'static str>, &'static str>,
    ) -> (Box<dyn TextExtractor>, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let boxed = Box::new(Fake { method, result, calls: calls.clone() });
        (boxed, calls)
    }

    fn existing_file() -> tempfile::NamedTempFile {
        tempfile::NamedTempFile::new().unwrap()
    }

    #[test]
    fn test_falls_through_errors_and_blank_text() {
        let (a, a_calls) = fake(ExtractionMethod::PdfToText, Err("corrupt"));
        let (b, b_calls) = fake(ExtractionMethod::Lopdf, Ok(vec!["  ", "\n"]));
        let (c, c_calls) = fake(ExtractionMethod::Ocr, Ok(vec!["67N ACMA"]));
        let router = ExtractionRouter::with_extractors(vec![a, b, c]);

        let file = existing_file();
        let result = router.extract(file.path()).unwrap();
        assert_eq!(result.method, ExtractionMethod::Ocr);
        assert_eq!(result.page_count, 1);
        assert_eq!(result.text, "\n--- Sayfa 1 (OCR) ---\n67N ACMA");
        assert_eq!((a_calls.get(), b_calls.get(), c_calls.get()), (1, 1, 1));
    }

    #[test]
    fn test_form_feed_only_text_layer_falls_back_to_ocr() {
        // Scanned PDF: pdftotext prints nothing but page breaks
        let scanned = crate::pdf_extraction::text_layer::split_pages("\x0c\x0c");
        assert_eq!(scanned, vec!["", ""]);

        let (a, _) = fake(ExtractionMethod::PdfToText, Ok(vec!["", ""]));
        let (b, b_calls) = fake(ExtractionMethod::Ocr, Ok(vec!["50N ACMA", "51 KALKMA"]));
        let router = ExtractionRouter::with_extractors(vec![a, b]);

        let file = existing_file();
        let result = router.extract(file.path()).unwrap();
        assert_eq!(result.method, ExtractionMethod::Ocr);
        assert_eq!(
            result.text,
            "\n--- Sayfa 1 (OCR) ---\n50N ACMA\n--- Sayfa 2 (OCR) ---\n51 KALKMA"
        );
        assert_eq!(b_calls.get(), 1);
    }

    #[test]
    fn test_stops_at_first_success() {
        let (a, _) = fake(ExtractionMethod::PdfToText, Ok(vec!["bir", "iki"]));
        let (b, b_calls) = fake(ExtractionMethod::Lopdf, Ok(vec!["never"]));
        let router = ExtractionRouter::with_extractors(vec![a, b]);

        let file = existing_file();
        let result = router.extract(file.path()).unwrap();
        assert_eq!(result.method, ExtractionMethod::PdfToText);
        assert_eq!(result.text, "\n--- Sayfa 1 ---\nbir\n--- Sayfa 2 ---\niki");
        assert_eq!(b_calls.get(), 0);
    }

    #[test]
    fn test_all_methods_fail() {
        let (a, _) = fake(ExtractionMethod::PdfToText, Err("boom"));
        let (b, _) = fake(ExtractionMethod::Lopdf, Ok(vec![]));
        let router = ExtractionRouter::with_extractors(vec![a, b]);

        let file = existing_file();
        let err = router.extract(file.path()).unwrap_err();
        assert!(matches!(err, FaultError::NoText(_)));
    }

    #[test]
    fn test_missing_input_is_not_found() {
        let (a, calls) = fake(ExtractionMethod::PdfToText, Ok(vec!["x"]));
        let router = ExtractionRouter::with_extractors(vec![a]);

        let err = router.extract(Path::new("/nope/aa.pdf")).unwrap_err();
        assert!(matches!(err, FaultError::NotFound(_)));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_empty_chain_is_no_text() {
        let router = ExtractionRouter::with_extractors(vec![]);
        let file = existing_file();
        assert!(matches!(router.extract(file.path()), Err(FaultError::NoText(_))));
    }

    #[test]
    fn test_lopdf_always_in_standard_chain() {
        let router = ExtractionRouter::from_config(&ExtractionConfig::default());
        assert!(router.methods().contains(&ExtractionMethod::Lopdf));
    }
}
