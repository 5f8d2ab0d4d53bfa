// Per-document pipeline: acquire text, analyse it, hand back one DocumentAnalysis
use rusttype::Font;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis;
use crate::chart;
use crate::config::AnalyzerConfig;
use crate::csv_export::ExportBatch;
use crate::pdf_extraction::ExtractionRouter;
use crate::report;
use crate::types::{file_stem, DocumentAnalysis, FaultError, Result};

// How much normalized text to echo at debug level
const PREVIEW_CHARS: usize = 500;

pub struct FaultAnalyzer {
    router: ExtractionRouter,
}

impl FaultAnalyzer {
    pub fn new(cfg: &AnalyzerConfig) -> Self {
        Self {
            router: ExtractionRouter::from_config(&cfg.extraction),
        }
    }

    pub fn with_router(router: ExtractionRouter) -> Self {
        Self { router }
    }

    pub fn analyze_pdf(&self, pdf_path: &Path) -> Result<DocumentAnalysis> {
        log::info!("Analysing {}", pdf_path.display());
        let extraction = self.router.extract(pdf_path)?;
        log::debug!(
            "{} took {}ms for {} pages",
            extraction.method,
            extraction.extraction_time_ms,
            extraction.page_count
        );
        Ok(analyze_raw_text(pdf_path, &extraction.text))
    }

    /// Analyses `pdfs` in order, writing each document's report (and chart)
    /// into `out.dir`. A document that fails to analyse or to write is logged
    /// and left out of the returned rows; the rest of the batch goes on.
    pub fn run_batch(&self, pdfs: &[PathBuf], out: &BatchOutput<'_>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let mut taken = HashSet::new();

        for pdf in pdfs {
            let mut doc = match self.analyze_pdf(pdf) {
                Ok(doc) => doc,
                Err(e) => {
                    log::error!("Skipping {}: {}", pdf.display(), e);
                    outcome.failed += 1;
                    continue;
                }
            };
            doc.name = unique_name(pdf, &mut taken);

            if let Err(e) = write_outputs(&doc, out) {
                log::error!("Skipping {}: {:#}", pdf.display(), e);
                outcome.failed += 1;
                continue;
            }
            outcome.rows.push_document(&doc);
        }

        outcome
    }
}

/// Where and what a batch writes per document.
pub struct BatchOutput<'a> {
    pub dir: &'a Path,
    pub chart: bool,
    pub font: Option<&'a Font<'static>>,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub rows: ExportBatch,
    pub failed: usize,
}

fn write_outputs(doc: &DocumentAnalysis, out: &BatchOutput<'_>) -> anyhow::Result<()> {
    let text = report::generate_report(&doc.fault, doc.detections(), &doc.analysis);
    report::save_report(out.dir, doc, &text)?;
    if out.chart {
        chart::save_chart(out.dir, doc, out.font)?;
    }
    Ok(())
}

/// The file stem, or `<stem>_<ext>` (then a counter) when another document in
/// the same run already took it, as with `kayit.pdf` next to `kayit.PDF`.
pub fn unique_name(source: &Path, taken: &mut HashSet<String>) -> String {
    let stem = file_stem(source);
    let mut name = stem.clone();

    if taken.contains(&name) {
        if let Some(ext) = source.extension() {
            name = format!("{}_{}", stem, ext.to_string_lossy());
        }
    }
    let mut n = 2;
    while taken.contains(&name) {
        name = format!("{}_{}", stem, n);
        n += 1;
    }

    taken.insert(name.clone());
    name
}

/// `*.pdf` files directly under `folder`, any extension case, sorted by name.
pub fn find_pdfs(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(FaultError::NotFound(folder.to_path_buf()));
    }

    let mut pdfs: Vec<PathBuf> = fs::read_dir(folder)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map_or(false, |ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    pdfs.sort();
    Ok(pdfs)
}

/// Pure part of the pipeline, usable on text obtained elsewhere.
pub fn analyze_raw_text(source: &Path, raw_text: &str) -> DocumentAnalysis {
    let (extracted_text, fault, analysis) = analysis::analyze_text(raw_text);

    log::info!(
        "{} characters of text, {} protection lines, {} recommendations",
        extracted_text.chars().count(),
        fault.active_protections.len(),
        analysis.recommendations.len()
    );
    log::debug!("Text preview:\n{}", preview(&extracted_text));

    DocumentAnalysis {
        source: source.to_path_buf(),
        name: file_stem(source),
        extracted_text,
        fault,
        analysis,
    }
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
