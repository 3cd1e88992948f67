//! Configuration for the extraction pipeline.
//!
//! All behaviour is controlled through [`ExtractionConfig`], built via its
//! [`ExtractionConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across tasks, log them, and diff two runs to
//! understand why their outputs differ.

use crate::error::NfseError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Configuration for NFS-e batch extraction.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use nfse_extract::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .model("gpt-4o-mini")
///     .concurrency(4)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Linear upscaling factor applied when rasterising PDF pages.
    /// Range: 1.0–6.0. Default: 3.0.
    ///
    /// 3.0 over the default page raster lands around 300 DPI — small print
    /// on municipal invoice layouts (CNPJ digits, tax tables) stays legible
    /// to the model without producing images beyond API upload limits.
    pub scale: f32,

    /// Maximum rendered page dimension (width or height) in pixels.
    /// Default: 4000.
    ///
    /// A safety cap independent of scale: an oversized page at 3× could
    /// otherwise exhaust memory. Either dimension is capped, the other scales
    /// proportionally.
    pub max_rendered_pixels: u32,

    /// JPEG quality for rasterised pages, 1–100. Default: 90.
    pub jpeg_quality: u8,

    /// Number of concurrent model calls per document. Default: 1.
    ///
    /// The pipeline is sequential by default — each page's record is decided
    /// before the next page is sent. Each page's request is independent and
    /// stateless, so raising this is safe and only trades API rate-limit
    /// headroom for wall-clock time.
    pub concurrency: usize,

    /// Model identifier, e.g. "gpt-4o-mini". If None, uses the provider
    /// default.
    pub model: Option<String>,

    /// Provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is auto-detected from the
    /// environment.
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Near-zero keeps the model faithful to what is printed on the page,
    /// which is exactly what field extraction wants.
    pub temperature: f32,

    /// Maximum tokens the model may generate per page. Default: 1000.
    ///
    /// A full 15-key JSON object with a long service description fits well
    /// under this; the ceiling mostly guards against runaway prose.
    pub max_tokens: usize,

    /// Maximum retry attempts on a transient model failure. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff).
    /// Default: 500.
    pub retry_backoff_ms: u64,

    /// Custom instruction prompt. If None, uses
    /// [`crate::prompts::EXTRACTION_PROMPT`].
    pub prompt: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-model-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Optional progress event sink. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            scale: 3.0,
            max_rendered_pixels: 4000,
            jpeg_quality: 90,
            concurrency: 1,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 1000,
            max_retries: 3,
            retry_backoff_ms: 500,
            prompt: None,
            download_timeout_secs: 120,
            api_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("scale", &self.scale)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("concurrency", &self.concurrency)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("prompt", &self.prompt.as_ref().map(|_| "<custom>"))
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn scale(mut self, scale: f32) -> Self {
        self.config.scale = scale.clamp(1.0, 6.0);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, NfseError> {
        let c = &self.config;
        if !(1.0..=6.0).contains(&c.scale) {
            return Err(NfseError::InvalidConfig(format!(
                "scale must be 1.0–6.0, got {}",
                c.scale
            )));
        }
        if c.concurrency == 0 {
            return Err(NfseError::InvalidConfig("concurrency must be ≥ 1".into()));
        }
        if c.max_tokens == 0 {
            return Err(NfseError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_baseline() {
        let c = ExtractionConfig::default();
        assert_eq!(c.scale, 3.0);
        assert_eq!(c.max_tokens, 1000);
        assert_eq!(c.concurrency, 1);
        assert!(c.model.is_none());
    }

    #[test]
    fn builder_clamps_out_of_range_values() {
        let c = ExtractionConfig::builder()
            .scale(99.0)
            .jpeg_quality(0)
            .concurrency(0)
            .build()
            .unwrap();
        assert_eq!(c.scale, 6.0);
        assert_eq!(c.jpeg_quality, 1);
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn debug_hides_provider_object() {
        let c = ExtractionConfig::default();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("ExtractionConfig"));
        assert!(!dbg.contains("dyn LLMProvider {"));
    }
}
