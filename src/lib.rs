//! # nfse-extract
//!
//! Extract structured fields from Brazilian electronic service invoices
//! (NFS-e) supplied as PDF or image files, using Vision Language Models.
//!
//! ## Why this crate?
//!
//! NFS-e layouts vary wildly between municipalities — template-based scrapers
//! and plain OCR break on every new city hall. Instead this crate rasterises
//! each page and lets a VLM read it the way an accountant would, returning a
//! typed record per invoice page: provider/customer CNPJ, invoice number,
//! issue date, total, service description, and the federal/municipal tax
//! withholdings.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / JPG / PNG
//!  │
//!  ├─ 1. Input    resolve local file or URL → (name, kind, bytes)
//!  ├─ 2. Raster   rasterise PDF pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Encode   JPEG → base64 ImageData
//!  ├─ 4. VLM      one stateless request per page (gpt-4o-mini / claude / …)
//!  ├─ 5. Parse    strict JSON, then a permissive Python-literal fallback
//!  ├─ 6. Filter   drop pages with no invoice content
//!  └─ 7. Report   ordered records + failure/rejection counters per document
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nfse_extract::{process_batch, resolve_input, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = ExtractionConfig::default();
//!     let doc = resolve_input("nota_fiscal.pdf", 120).await?;
//!     let report = process_batch(&[doc], &config).await?;
//!
//!     println!("{}", nfse_extract::export::to_csv(
//!         &report.records().cloned().collect::<Vec<_>>())?);
//!     eprintln!("{:?}", report.summary());
//!     Ok(())
//! }
//! ```
//!
//! ## Failure model
//!
//! One bad page never costs a batch: decode, model, and parse failures are
//! contained in the per-document [`DocumentReport`] alongside the accepted
//! records. See [`error`] for the full taxonomy.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `nfse` binary (clap + anyhow + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use error::{NfseError, PageFailure};
pub use output::{BatchReport, BatchSummary, DocumentReport, ExtractionRecord};
pub use pipeline::input::{resolve_input, SourceDocument, SourceKind};
pub use pipeline::raster::PageImage;
pub use process::{evaluate_page, process_batch, process_document, PageOutcome};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
