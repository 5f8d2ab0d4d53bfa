// relayfault CLI - analyse relay fault record PDFs, export reports and tables
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::env;
use std::path::{Path, PathBuf};
use std::process;

use relayfault::chart;
use relayfault::config::{AnalyzerConfig, DEFAULT_PDF};
use relayfault::csv_export::ExportBatch;
use relayfault::pipeline::{find_pdfs, BatchOutput, FaultAnalyzer};
use relayfault::report;
use relayfault::txt_import;
use relayfault::types::FaultError;

#[derive(Parser, Debug)]
#[command(name = "relayfault")]
#[command(author, version, about = "Protective relay fault record analyser")]
struct Cli {
    /// Debug-level logging (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file, instead of $RELAYFAULT_CONFIG or the user config dir
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyse one fault record PDF and print the report
    Analyze {
        /// Path to PDF file
        #[arg(default_value = DEFAULT_PDF)]
        pdf: PathBuf,
        /// Output folder (defaults to the PDF's folder)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Also write the CSV tables
        #[arg(long)]
        csv: bool,
        /// Also render the PNG chart
        #[arg(long)]
        chart: bool,
        /// Print the structured result as JSON instead of the text report
        #[arg(long)]
        json: bool,
    },
    /// Analyse every PDF in a folder and write one combined CSV set
    Batch {
        /// Folder with fault record PDFs
        folder: PathBuf,
        /// Output folder (defaults to the input folder)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Also render a PNG chart per document
        #[arg(long)]
        chart: bool,
    },
    /// Convert saved *_report.txt files into CSV tables
    Convert {
        /// Folder with *_report.txt files
        input: PathBuf,
        /// Folder that receives CSV_Data/
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(cli) {
        if let Some(FaultError::NotFound(path)) = e.downcast_ref::<FaultError>() {
            let cwd = env::current_dir().unwrap_or_default();
            log::error!(
                "{} does not exist (looked relative to {})",
                path.display(),
                cwd.display()
            );
        }
        log::error!("{:?}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let cfg = AnalyzerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze { pdf, out, csv, chart, json } => {
            let out_dir = out.unwrap_or_else(|| parent_dir(&pdf));
            analyze(&cfg, &pdf, &out_dir, csv, chart || cfg.output.chart, json)
        }
        Commands::Batch { folder, out, chart } => {
            let out_dir = out.unwrap_or_else(|| folder.clone());
            batch(&cfg, &folder, &out_dir, chart || cfg.output.chart)
        }
        Commands::Convert { input, output } => {
            let written = txt_import::convert_reports(&input, &cfg.csv_dir(&output))?;
            if !written.is_empty() {
                log::info!("Wrote {} CSV files into {}", written.len(), cfg.csv_dir(&output).display());
            }
            Ok(())
        }
    }
}

fn analyze(
    cfg: &AnalyzerConfig,
    pdf: &Path,
    out_dir: &Path,
    csv: bool,
    with_chart: bool,
    json: bool,
) -> Result<()> {
    let analyzer = FaultAnalyzer::new(cfg);
    let doc = analyzer.analyze_pdf(pdf)?;

    let text = report::generate_report(&doc.fault, doc.detections(), &doc.analysis);
    if json {
        println!("{}", serde_json::to_string_pretty(&doc).context("serialising analysis")?);
    } else {
        println!("{}", text);
    }
    report::save_report(out_dir, &doc, &text)?;

    if csv {
        let mut rows = ExportBatch::new();
        rows.push_document(&doc);
        rows.save(&cfg.csv_dir(out_dir))?;
    }

    if with_chart {
        let font = chart::load_font(cfg.font_path().as_deref());
        chart::save_chart(out_dir, &doc, font.as_ref())?;
    }

    Ok(())
}

fn batch(cfg: &AnalyzerConfig, folder: &Path, out_dir: &Path, with_chart: bool) -> Result<()> {
    let pdfs = find_pdfs(folder)?;
    if pdfs.is_empty() {
        log::warn!("No PDF files in {}", folder.display());
        return Ok(());
    }
    log::info!("Found {} PDF files", pdfs.len());

    let analyzer = FaultAnalyzer::new(cfg);
    let font = if with_chart {
        chart::load_font(cfg.font_path().as_deref())
    } else {
        None
    };

    let outcome = analyzer.run_batch(
        &pdfs,
        &BatchOutput {
            dir: out_dir,
            chart: with_chart,
            font: font.as_ref(),
        },
    );

    outcome.rows.save(&cfg.csv_dir(out_dir))?;
    log::info!(
        "Batch done: {} analysed, {} failed",
        outcome.rows.len(),
        outcome.failed
    );
    Ok(())
}

// "aa.pdf" has an empty parent
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
