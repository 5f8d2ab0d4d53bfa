// Text-layer extraction: pdftotext first, lopdf as the pure Rust fallback
use anyhow::{Context, Result};
use lopdf::Document;
use std::ffi::OsStr;
use std::path::Path;

use super::extraction_router::{ExtractionMethod, TextExtractor};
use super::tools::{command_exists, run_tool};

// pdftotext separates pages with a form feed
const PAGE_BREAK: char = '\x0c';

/// `pdftotext -layout <pdf> -`, split back into pages.
pub struct PdfToTextExtractor {
    program: String,
}

impl PdfToTextExtractor {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl TextExtractor for PdfToTextExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::PdfToText
    }

    fn is_available(&self) -> bool {
        command_exists(&self.program)
    }

    fn extract_pages(&self, pdf_path: &Path) -> Result<Vec<String>> {
        let stdout = run_tool(
            &self.program,
            [OsStr::new("-layout"), pdf_path.as_os_str(), OsStr::new("-")],
        )?;
        Ok(split_pages(&String::from_utf8_lossy(&stdout)))
    }
}

pub fn split_pages(text: &str) -> Vec<String> {
    let mut pages: Vec<String> = text.split(PAGE_BREAK).map(str::to_string).collect();
    // Output ends with a form feed, leaving one empty tail
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
}

/// Text operators read straight out of the content streams with lopdf.
pub struct LopdfExtractor;

impl TextExtractor for LopdfExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Lopdf
    }

    fn is_available(&self) -> bool {
        true
    }

    fn extract_pages(&self, pdf_path: &Path) -> Result<Vec<String>> {
        let document = load_pdf(pdf_path)?;
        let mut pages = Vec::new();
        for page_number in document.get_pages().keys() {
            let text = document
                .extract_text(&[*page_number])
                .with_context(|| format!("page {}", page_number))?;
            pages.push(text);
        }
        Ok(pages)
    }
}

/// Load a PDF document using lopdf
pub fn load_pdf(path: &Path) -> Result<Document> {
    Document::load(path).with_context(|| format!("loading {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pages_drops_trailing_feed() {
        let pages = split_pages("Sayfa bir\n\x0cSayfa iki\n\x0c");
        assert_eq!(pages, vec!["Sayfa bir\n", "Sayfa iki\n"]);
    }

    #[test]
    fn test_split_pages_single_page() {
        assert_eq!(split_pages("tek sayfa"), vec!["tek sayfa"]);
        assert_eq!(split_pages(""), vec![""]);
    }

    #[test]
    fn test_lopdf_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bozuk.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();
        assert!(LopdfExtractor.extract_pages(&path).is_err());
        assert!(load_pdf(&path).is_err());
    }
}
