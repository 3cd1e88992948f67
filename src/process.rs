//! The aggregator: fan documents out into per-page extraction calls and
//! collect the accepted records into ordered reports.
//!
//! ## Containment policy
//!
//! Nothing a single page or document does can abort a batch. Decode errors,
//! model failures, and unparseable responses are folded into the
//! [`DocumentReport`] they belong to; the caller always receives every
//! accepted record plus the failure/rejection counts. The only fatal errors
//! are the ones that make the whole run impossible — chiefly an unconfigured
//! provider.
//!
//! ## Ordering
//!
//! The batch result set is ordered by input file, then by page within each
//! file. Pages run sequentially by default; with `concurrency > 1` they run
//! through `buffer_unordered` and are re-sorted by page index afterwards, so
//! the ordering invariant holds either way.

use crate::config::ExtractionConfig;
use crate::error::{NfseError, PageFailure};
use crate::output::{BatchReport, DocumentReport, ExtractionRecord};
use crate::pipeline::{encode, input::SourceDocument, llm, parse, raster};
use edgequake_llm::{ImageData, LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Model used when neither the config nor the environment names one.
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// The decision for one page after parsing and validity filtering.
#[derive(Debug)]
pub enum PageOutcome {
    /// The page yielded a record with at least one content field.
    Accepted(ExtractionRecord),
    /// The page parsed cleanly but every content field was null.
    Rejected,
    /// Rasterisation, the model call, or response parsing failed.
    Failed(PageFailure),
}

/// Decide a page from the model's raw response text.
///
/// This is the pure kernel of the pipeline: parse → build record → validity
/// filter → tag with file name and page number. It has no I/O, which is what
/// keeps the whole decision path testable without a model.
pub fn evaluate_page(file: &str, page: usize, raw: &str) -> PageOutcome {
    match parse::parse_fields(raw) {
        Err(detail) => PageOutcome::Failed(PageFailure::ResponseParse { page, detail }),
        Ok(map) => {
            let record = parse::record_from_map(&map, file, page);
            if record.has_content() {
                PageOutcome::Accepted(record)
            } else {
                PageOutcome::Rejected
            }
        }
    }
}

/// Process a batch of documents in input order.
///
/// The returned report concatenates each document's records in submission
/// order. Per-document and per-page problems are contained in the report;
/// see the module docs for the containment policy.
pub async fn process_batch(
    documents: &[SourceDocument],
    config: &ExtractionConfig,
) -> Result<BatchReport, NfseError> {
    let provider = resolve_provider(config)?;
    info!("Starting batch: {} documents", documents.len());

    if let Some(cb) = &config.progress_callback {
        cb.on_batch_start(documents.len());
    }

    let mut report = BatchReport::default();
    for doc in documents {
        let doc_report = process_with_provider(&provider, doc, config).await;
        if let Some(cb) = &config.progress_callback {
            cb.on_document_complete(&doc.name, doc_report.records.len());
        }
        report.documents.push(doc_report);
    }

    let summary = report.summary();
    info!(
        "Batch complete: {}/{} documents yielded data, {} records, {} failures, {} rejections",
        summary.documents_with_records,
        summary.total_documents,
        summary.total_records,
        summary.failed_pages,
        summary.rejected_pages
    );
    if let Some(cb) = &config.progress_callback {
        cb.on_batch_complete(&summary);
    }

    Ok(report)
}

/// Process a single document.
///
/// Convenience wrapper over the batch path for callers with one file.
pub async fn process_document(
    document: &SourceDocument,
    config: &ExtractionConfig,
) -> Result<DocumentReport, NfseError> {
    let provider = resolve_provider(config)?;
    Ok(process_with_provider(&provider, document, config).await)
}

// ── Internal pipeline ────────────────────────────────────────────────────────

async fn process_with_provider(
    provider: &Arc<dyn LLMProvider>,
    doc: &SourceDocument,
    config: &ExtractionConfig,
) -> DocumentReport {
    let start = Instant::now();

    // ── Rasterise ────────────────────────────────────────────────────────
    let raster_out = match raster::rasterize(doc, config).await {
        Ok(out) => out,
        Err(failure) => {
            warn!("'{}': {}", doc.name, failure);
            if let Some(cb) = &config.progress_callback {
                cb.on_document_start(&doc.name, 0);
                cb.on_page_failed(&doc.name, failure.page(), failure.to_string());
            }
            return DocumentReport {
                file_name: doc.name.clone(),
                page_count: 0,
                records: vec![],
                failures: vec![failure],
                rejected_pages: vec![],
                duration_ms: start.elapsed().as_millis() as u64,
            };
        }
    };

    let page_count = raster_out.pages.len();
    if let Some(cb) = &config.progress_callback {
        cb.on_document_start(&doc.name, page_count);
    }

    let mut failures = raster_out.failures;
    if let Some(cb) = &config.progress_callback {
        for f in &failures {
            cb.on_page_failed(&doc.name, f.page(), f.to_string());
        }
    }

    // Zero extractable pages is "no data", not a fault.
    if page_count == 0 {
        if failures.is_empty() {
            let failure = PageFailure::EmptyDocument {
                file: doc.name.clone(),
            };
            warn!("'{}': {}", doc.name, failure);
            if let Some(cb) = &config.progress_callback {
                cb.on_page_failed(&doc.name, None, failure.to_string());
            }
            failures.push(failure);
        }
        return DocumentReport {
            file_name: doc.name.clone(),
            page_count: 0,
            records: vec![],
            failures,
            rejected_pages: vec![],
            duration_ms: start.elapsed().as_millis() as u64,
        };
    }

    // ── Encode pages ─────────────────────────────────────────────────────
    let encoded: Vec<(usize, ImageData)> = raster_out
        .pages
        .iter()
        .map(|p| (p.page_index, encode::encode_page(p)))
        .collect();

    // ── Model calls + page decisions ─────────────────────────────────────
    let outcomes = if config.concurrency > 1 {
        run_concurrent(provider, &doc.name, &encoded, config).await
    } else {
        run_sequential(provider, &doc.name, &encoded, config).await
    };

    // ── Fold into the report ─────────────────────────────────────────────
    let (records, page_failures, rejected_pages) = fold_outcomes(outcomes);
    failures.extend(page_failures);

    debug!(
        "'{}': {} records, {} failures, {} rejections",
        doc.name,
        records.len(),
        failures.len(),
        rejected_pages.len()
    );

    DocumentReport {
        file_name: doc.name.clone(),
        page_count,
        records,
        failures,
        rejected_pages,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

/// Baseline scheduling: one page at a time, in ascending page order.
async fn run_sequential(
    provider: &Arc<dyn LLMProvider>,
    file: &str,
    pages: &[(usize, ImageData)],
    config: &ExtractionConfig,
) -> Vec<(usize, PageOutcome)> {
    let mut outcomes = Vec::with_capacity(pages.len());
    for (page, image) in pages {
        let outcome = run_page(provider, file, *page, image.clone(), config).await;
        outcomes.push((*page, outcome));
    }
    outcomes
}

/// Optional hardening: independent pages in flight at once.
///
/// Safe because every page request is stateless; ordering is restored by
/// [`fold_outcomes`].
async fn run_concurrent(
    provider: &Arc<dyn LLMProvider>,
    file: &str,
    pages: &[(usize, ImageData)],
    config: &ExtractionConfig,
) -> Vec<(usize, PageOutcome)> {
    stream::iter(pages.iter().map(|(page, image)| {
        let provider = Arc::clone(provider);
        let config = config.clone();
        let file = file.to_string();
        let page = *page;
        let image = image.clone();
        async move {
            let outcome = run_page(&provider, &file, page, image, &config).await;
            (page, outcome)
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await
}

/// One page end to end: model call → parse → validity filter → callback.
async fn run_page(
    provider: &Arc<dyn LLMProvider>,
    file: &str,
    page: usize,
    image: ImageData,
    config: &ExtractionConfig,
) -> PageOutcome {
    let response = llm::request_page(provider, page, image, config).await;

    let outcome = match response.failure {
        Some(failure) => PageOutcome::Failed(failure),
        None => evaluate_page(file, page, &response.raw),
    };

    if let Some(cb) = &config.progress_callback {
        match &outcome {
            PageOutcome::Accepted(_) => cb.on_page_accepted(file, page),
            PageOutcome::Rejected => cb.on_page_rejected(file, page),
            PageOutcome::Failed(f) => cb.on_page_failed(file, Some(page), f.to_string()),
        }
    }

    outcome
}

/// Sort outcomes by page and split them into the report's three buckets.
fn fold_outcomes(
    mut outcomes: Vec<(usize, PageOutcome)>,
) -> (Vec<ExtractionRecord>, Vec<PageFailure>, Vec<usize>) {
    outcomes.sort_by_key(|(page, _)| *page);

    let mut records = Vec::new();
    let mut failures = Vec::new();
    let mut rejected = Vec::new();

    for (page, outcome) in outcomes {
        match outcome {
            PageOutcome::Accepted(record) => records.push(record),
            PageOutcome::Rejected => rejected.push(page),
            PageOutcome::Failed(failure) => failures.push(failure),
        }
    }

    (records, failures, rejected)
}

// ── Provider resolution ──────────────────────────────────────────────────────

/// Instantiate a named provider with the given model.
fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, NfseError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        NfseError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — used as-is; the hook for
///    tests and callers with custom middleware.
/// 2. **Named provider + model** (`config.provider_name`) — the factory reads
///    the matching API key from the environment.
/// 3. **Environment pair** (`NFSE_LLM_PROVIDER` + `NFSE_MODEL`) — a choice
///    made at the execution-environment level (shell script, CI).
/// 4. **Auto-detection** — prefer OpenAI when `OPENAI_API_KEY` is present
///    (the documents were tuned against gpt-4o-mini), otherwise let the
///    factory scan all known key variables.
fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, NfseError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("NFSE_LLM_PROVIDER"),
        std::env::var("NFSE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| NfseError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
