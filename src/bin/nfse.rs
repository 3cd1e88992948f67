//! CLI binary for nfse-extract.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, drives a progress bar from the callback trait, and
//! writes the CSV/JSON exports.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use nfse_extract::{
    export, normalize, process_batch, resolve_input, BatchSummary, ExtractionConfig,
    ExtractionProgressCallback,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar across the batch (a tick per document) with
/// per-page log lines printed above it. Page events may arrive out of order
/// when concurrency is enabled; every method is safe to call concurrently.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} files  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");

        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl ExtractionProgressCallback for CliProgress {
    fn on_batch_start(&self, total_documents: usize) {
        self.bar.set_length(total_documents as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_documents} file(s)…"))
        ));
    }

    fn on_document_start(&self, file_name: &str, page_count: usize) {
        self.bar
            .set_message(format!("{file_name} ({page_count} page(s))"));
    }

    fn on_page_accepted(&self, file_name: &str, page: usize) {
        self.bar
            .println(format!("  {} {file_name} p.{page}", green("✓")));
    }

    fn on_page_rejected(&self, file_name: &str, page: usize) {
        self.bar.println(format!(
            "  {} {file_name} p.{page}  {}",
            dim("∅"),
            dim("no invoice content")
        ));
    }

    fn on_page_failed(&self, file_name: &str, page: Option<usize>, error: String) {
        let scope = match page {
            Some(p) => format!("{file_name} p.{p}"),
            None => file_name.to_string(),
        };
        let msg = if error.len() > 100 {
            format!("{}…", &error[..99])
        } else {
            error
        };
        self.bar
            .println(format!("  {} {scope}  {}", red("✗"), red(&msg)));
    }

    fn on_document_complete(&self, _file_name: &str, _records: usize) {
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, summary: &BatchSummary) {
        self.bar.finish_and_clear();
        let ok = summary.failed_pages == 0;
        eprintln!(
            "{} {}/{} files yielded data — {} record(s), {} failure(s), {} page(s) without content",
            if ok { green("✔") } else { cyan("⚠") },
            bold(&summary.documents_with_records.to_string()),
            summary.total_documents,
            bold(&summary.total_records.to_string()),
            summary.failed_pages,
            summary.rejected_pages,
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract one invoice, CSV to stdout
  nfse nota_fiscal.pdf

  # A whole batch, with exports
  nfse notas/*.pdf scans/*.jpg --csv resultados.csv --json resultados.json

  # Use a specific model / provider
  nfse --provider openai --model gpt-4o nota.pdf

  # From a URL
  nfse https://example.com/nota_123.pdf --json nota.json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY       OpenAI API key (preferred when present)
  ANTHROPIC_API_KEY    Anthropic API key
  GEMINI_API_KEY       Google Gemini API key
  NFSE_LLM_PROVIDER    Override provider (openai, anthropic, gemini, ollama)
  NFSE_MODEL           Override model ID

The pdfium shared library must be loadable (system-installed libpdfium).
"#;

/// Extract structured fields from Brazilian NFS-e invoices (PDF/JPG/PNG).
#[derive(Parser, Debug)]
#[command(
    name = "nfse",
    version,
    about = "Extract structured fields from Brazilian NFS-e service invoices using Vision LLMs",
    long_about = "Extract provider/customer CNPJ, invoice number, issue date, total value, \
service description, and tax withholdings from NFS-e documents (PDF, JPG, PNG — local files \
or URLs), one record per invoice page. Results go to CSV (';'-separated, pt-BR number \
formatting) and/or JSON (canonical values).",
    arg_required_else_help = true,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input files or URLs (PDF, JPG, JPEG, PNG).
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Write the CSV export to this file.
    #[arg(long, env = "NFSE_CSV")]
    csv: Option<PathBuf>,

    /// Write the JSON export to this file.
    #[arg(long, env = "NFSE_JSON")]
    json: Option<PathBuf>,

    /// Model ID (e.g. gpt-4o-mini, gpt-4o, claude-sonnet-4-20250514).
    #[arg(long, env = "NFSE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "NFSE_PROVIDER")]
    provider: Option<String>,

    /// Concurrent model calls per document (1 = fully sequential).
    #[arg(short, long, env = "NFSE_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Retries per page on transient model failures.
    #[arg(long, env = "NFSE_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Max model output tokens per page.
    #[arg(long, env = "NFSE_MAX_TOKENS", default_value_t = 1000)]
    max_tokens: usize,

    /// PDF rasterisation scale factor (3.0 ≈ 300 DPI).
    #[arg(long, env = "NFSE_SCALE", default_value_t = 3.0)]
    scale: f32,

    /// Download timeout for URL inputs, in seconds.
    #[arg(long, env = "NFSE_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable the progress bar.
    #[arg(long, env = "NFSE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "NFSE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the stdout export.
    #[arg(short, long, env = "NFSE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar provides the per-page feedback, so library INFO logs
    // are suppressed unless --verbose is given.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    // ── Resolve inputs ───────────────────────────────────────────────────
    let mut documents = Vec::with_capacity(cli.inputs.len());
    let mut unresolved = 0usize;
    for input in &cli.inputs {
        match resolve_input(input, cli.download_timeout).await {
            Ok(doc) => documents.push(doc),
            Err(e) => {
                unresolved += 1;
                eprintln!("{} {input}: {e}", red("✗"));
            }
        }
    }
    if documents.is_empty() {
        anyhow::bail!("no readable input files");
    }

    // ── Build config ─────────────────────────────────────────────────────
    let mut builder = ExtractionConfig::builder()
        .scale(cli.scale)
        .concurrency(cli.concurrency)
        .max_retries(cli.max_retries)
        .max_tokens(cli.max_tokens)
        .download_timeout_secs(cli.download_timeout);

    if let Some(model) = &cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(provider) = &cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if show_progress {
        builder = builder.progress_callback(CliProgress::new());
    }

    let config = builder.build().context("Invalid configuration")?;

    // ── Run the batch ────────────────────────────────────────────────────
    let report = process_batch(&documents, &config)
        .await
        .context("Extraction failed")?;

    let records: Vec<_> = report.records().cloned().collect();
    let summary = report.summary();

    if records.is_empty() {
        eprintln!("{}", red("No invoice data could be extracted."));
    } else if !cli.quiet && !show_progress {
        for r in &records {
            eprintln!(
                "{} p.{}  nota {}  {}",
                r.nome_arquivo,
                r.pagina,
                r.numero_nota.as_deref().unwrap_or("—"),
                normalize::to_display(r.valor_total.as_deref()),
            );
        }
        eprintln!(
            "{}/{} files yielded data — {} record(s), {} failure(s), {} rejection(s)",
            summary.documents_with_records,
            summary.total_documents,
            summary.total_records,
            summary.failed_pages,
            summary.rejected_pages,
        );
    }

    // ── Exports ──────────────────────────────────────────────────────────
    if let Some(path) = &cli.csv {
        export::write_csv(path, &records).context("Failed to write CSV export")?;
        if !cli.quiet {
            eprintln!("  CSV  → {}", bold(&path.display().to_string()));
        }
    }
    if let Some(path) = &cli.json {
        export::write_json(path, &records).context("Failed to write JSON export")?;
        if !cli.quiet {
            eprintln!("  JSON → {}", bold(&path.display().to_string()));
        }
    }

    // Default: CSV on stdout, keeping stderr for progress and diagnostics.
    if cli.csv.is_none() && cli.json.is_none() && !records.is_empty() {
        let csv = export::to_csv(&records).context("Failed to render CSV")?;
        io::stdout()
            .write_all(csv.as_bytes())
            .context("Failed to write to stdout")?;
    }

    if unresolved > 0 && !cli.quiet {
        eprintln!("{} {unresolved} input(s) could not be read", cyan("⚠"));
    }

    Ok(())
}
