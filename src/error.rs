//! Error types for the nfse-extract library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`NfseError`] — **Fatal**: the run cannot proceed at all (provider not
//!   configured, invalid configuration, output file unwritable). Returned as
//!   `Err(NfseError)` from the top-level `process_*` functions.
//!
//! * [`PageFailure`] — **Non-fatal**: one document or one page failed
//!   (undecodable PDF, transient API error, unparseable model response) but
//!   the rest of the batch is fine. Stored inside
//!   [`crate::output::DocumentReport`] so callers can inspect partial success
//!   rather than losing the whole batch to one bad page.
//!
//! A page whose parsed record carries no content at all is *not* a failure —
//! it is recorded in [`crate::output::DocumentReport::rejected_pages`] as an
//! informational rejection.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the nfse-extract library.
///
/// Page- and document-level failures use [`PageFailure`] and are stored in
/// [`crate::output::DocumentReport`] rather than propagated here.
#[derive(Debug, Error)]
pub enum NfseError {
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not create or write an export file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal failure scoped to one document or one page.
///
/// Stored in [`crate::output::DocumentReport::failures`]. Processing of the
/// remaining pages and documents always continues.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageFailure {
    /// The document could not be opened or decoded at all.
    #[error("'{file}': document could not be decoded: {detail}")]
    DocumentDecode { file: String, detail: String },

    /// The PDF opened cleanly but contains zero pages.
    #[error("'{file}': document has no extractable pages")]
    EmptyDocument { file: String },

    /// One page failed to rasterise; remaining pages were still processed.
    #[error("'{file}' page {page}: rasterisation failed: {detail}")]
    RenderFailed {
        file: String,
        page: usize,
        detail: String,
    },

    /// The model call failed after all retries (network, auth, rate limit).
    #[error("page {page}: model request failed after {retries} retries: {detail}")]
    ModelRequest {
        page: usize,
        retries: u8,
        detail: String,
    },

    /// Neither the strict nor the permissive decoder understood the response.
    #[error("page {page}: response could not be parsed: {detail}")]
    ResponseParse { page: usize, detail: String },
}

impl PageFailure {
    /// The 1-based page this failure is scoped to, if it is page-scoped.
    pub fn page(&self) -> Option<usize> {
        match self {
            PageFailure::DocumentDecode { .. } | PageFailure::EmptyDocument { .. } => None,
            PageFailure::RenderFailed { page, .. }
            | PageFailure::ModelRequest { page, .. }
            | PageFailure::ResponseParse { page, .. } => Some(*page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_display() {
        let f = PageFailure::EmptyDocument {
            file: "nota.pdf".into(),
        };
        assert!(f.to_string().contains("nota.pdf"), "got: {f}");
        assert_eq!(f.page(), None);
    }

    #[test]
    fn model_request_display() {
        let f = PageFailure::ModelRequest {
            page: 3,
            retries: 3,
            detail: "HTTP 429".into(),
        };
        let msg = f.to_string();
        assert!(msg.contains("page 3"));
        assert!(msg.contains("HTTP 429"));
        assert_eq!(f.page(), Some(3));
    }

    #[test]
    fn response_parse_display() {
        let f = PageFailure::ResponseParse {
            page: 1,
            detail: "expected value at line 1".into(),
        };
        assert!(f.to_string().contains("could not be parsed"));
    }

    #[test]
    fn provider_not_configured_display() {
        let e = NfseError::ProviderNotConfigured {
            provider: "openai".into(),
            hint: "set OPENAI_API_KEY".into(),
        };
        assert!(e.to_string().contains("openai"));
        assert!(e.to_string().contains("OPENAI_API_KEY"));
    }
}
