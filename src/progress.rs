//! Progress-callback trait for per-document and per-page events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! real-time events while a batch is processed. The library itself has no
//! reference to any display surface — presentation is entirely the caller's
//! concern. The CLI forwards these events to a terminal progress bar; a web
//! frontend could forward them to a channel or a websocket instead.
//!
//! Implementations must be `Send + Sync`: when page concurrency is enabled,
//! page events may fire from different tasks at the same time.

use std::sync::Arc;

use crate::output::BatchSummary;

/// Called by the aggregator as it processes documents and pages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before the first document is touched.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called when a document's pages have been rasterised, before any model
    /// call for it is made. `page_count` may be 0 for empty/undecodable input.
    fn on_document_start(&self, file_name: &str, page_count: usize) {
        let _ = (file_name, page_count);
    }

    /// Called when a page produced an accepted record.
    fn on_page_accepted(&self, file_name: &str, page: usize) {
        let _ = (file_name, page);
    }

    /// Called when a page parsed cleanly but carried no invoice content.
    fn on_page_rejected(&self, file_name: &str, page: usize) {
        let _ = (file_name, page);
    }

    /// Called when a page or document failed (render, model, or parse).
    fn on_page_failed(&self, file_name: &str, page: Option<usize>, error: String) {
        let _ = (file_name, page, error);
    }

    /// Called after a document's last page has been decided.
    fn on_document_complete(&self, file_name: &str, records: usize) {
        let _ = (file_name, records);
    }

    /// Called once after the whole batch, with the final counters.
    fn on_batch_complete(&self, summary: &BatchSummary) {
        let _ = summary;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in
/// [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCallback {
        accepted: AtomicUsize,
        rejected: AtomicUsize,
        failed: AtomicUsize,
    }

    impl ExtractionProgressCallback for CountingCallback {
        fn on_page_accepted(&self, _file: &str, _page: usize) {
            self.accepted.fetch_add(1, Ordering::SeqCst);
        }
        fn on_page_rejected(&self, _file: &str, _page: usize) {
            self.rejected.fetch_add(1, Ordering::SeqCst);
        }
        fn on_page_failed(&self, _file: &str, _page: Option<usize>, _error: String) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_document_start("a.pdf", 3);
        cb.on_page_accepted("a.pdf", 1);
        cb.on_page_rejected("a.pdf", 2);
        cb.on_page_failed("a.pdf", Some(3), "timeout".into());
        cb.on_document_complete("a.pdf", 1);
    }

    #[test]
    fn counting_callback_receives_events() {
        let cb = CountingCallback {
            accepted: AtomicUsize::new(0),
            rejected: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        };
        cb.on_page_accepted("a.pdf", 1);
        cb.on_page_accepted("a.pdf", 2);
        cb.on_page_rejected("a.pdf", 3);
        cb.on_page_failed("a.pdf", None, "decode".into());

        assert_eq!(cb.accepted.load(Ordering::SeqCst), 2);
        assert_eq!(cb.rejected.load(Ordering::SeqCst), 1);
        assert_eq!(cb.failed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_is_send() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn ExtractionProgressCallback>();

        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(1);
    }
}
