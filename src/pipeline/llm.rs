//! Model interaction: send one page image to the vision model and collect
//! the raw response text.
//!
//! This module is intentionally thin — the instruction text lives in
//! [`crate::prompts`] and response interpretation in
//! [`crate::pipeline::parse`], so retry and error handling here never need to
//! change when the contract does.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient and frequent under
//! concurrent load. Exponential backoff (`retry_backoff_ms * 2^attempt`)
//! avoids thundering-herd: with 500 ms base and 3 retries the wait sequence
//! is 500 ms → 1 s → 2 s, totalling < 4 s of back-off per page.

use crate::config::ExtractionConfig;
use crate::error::PageFailure;
use crate::prompts::EXTRACTION_PROMPT;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Raw result of one page's model call.
///
/// Always returned — a failed call carries its [`PageFailure`] instead of
/// propagating an error, so one bad page never aborts the document.
#[derive(Debug)]
pub struct PageResponse {
    /// 1-based page number.
    pub page: usize,
    /// Raw response text; empty when `failure` is set.
    pub raw: String,
    /// Retries consumed before success or giving up.
    pub retries: u8,
    pub duration_ms: u64,
    pub failure: Option<PageFailure>,
}

/// Send one page image to the model and return the raw response text.
///
/// ## Message Layout
///
/// Exactly one user message carrying the fixed instruction text plus the page
/// image as an inline base64 attachment. Each page is an independent,
/// stateless request: no system message, no prior conversation context, a
/// 1000-token output ceiling by default.
pub async fn request_page(
    provider: &Arc<dyn LLMProvider>,
    page: usize,
    image_data: ImageData,
    config: &ExtractionConfig,
) -> PageResponse {
    let start = Instant::now();
    let prompt = config.prompt.as_deref().unwrap_or(EXTRACTION_PROMPT);

    let messages = vec![ChatMessage::user_with_images(prompt, vec![image_data])];
    let options = build_options(config);

    let mut last_err: Option<String> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "Page {}: retry {}/{} after {}ms",
                page, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        let call = timeout(
            Duration::from_secs(config.api_timeout_secs),
            provider.chat(&messages, Some(&options)),
        );

        match call.await {
            Err(_elapsed) => {
                let err_msg = format!("timed out after {}s", config.api_timeout_secs);
                warn!("Page {}: attempt {} failed — {}", page, attempt + 1, err_msg);
                last_err = Some(err_msg);
            }
            Ok(Ok(response)) => {
                let duration = start.elapsed();
                debug!(
                    "Page {}: {} input tokens, {} output tokens, {:?}",
                    page, response.prompt_tokens, response.completion_tokens, duration
                );

                return PageResponse {
                    page,
                    raw: response.content,
                    retries: attempt as u8,
                    duration_ms: duration.as_millis() as u64,
                    failure: None,
                };
            }
            Ok(Err(e)) => {
                let err_msg = format!("{e}");
                warn!("Page {}: attempt {} failed — {}", page, attempt + 1, err_msg);
                last_err = Some(err_msg);
            }
        }
    }

    // All retries exhausted
    let duration = start.elapsed();
    let detail = last_err.unwrap_or_else(|| "unknown error".to_string());

    PageResponse {
        page,
        raw: String::new(),
        retries: config.max_retries as u8,
        duration_ms: duration.as_millis() as u64,
        failure: Some(PageFailure::ModelRequest {
            page,
            retries: config.max_retries as u8,
            detail,
        }),
    }
}

/// Build `CompletionOptions` from the extraction config.
fn build_options(config: &ExtractionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_defaults() {
        let config = ExtractionConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(1000));
    }
}
