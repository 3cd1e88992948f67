//! Input resolution: normalise a user-supplied path or URL into a
//! [`SourceDocument`].
//!
//! The pipeline downstream only ever sees `(name, kind, bytes)` — whether the
//! bytes came from disk or over HTTP is decided here and nowhere else. The
//! file kind is taken from the extension and then verified against the magic
//! bytes, so a PNG renamed to `.pdf` is caught before pdfium ever sees it.

use crate::error::PageFailure;
use std::path::Path;
use tracing::{debug, info};

/// How a source document should be rasterised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Multi-page PDF; every page is rendered.
    Pdf,
    /// Single raster image (JPEG or PNG); passed to the model as-is.
    Image,
}

/// One uploaded/submitted file: name, kind, and raw bytes.
///
/// The bytes are owned by the caller for the duration of processing; nothing
/// is written to disk.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub name: String,
    pub kind: SourceKind,
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    /// Wrap in-memory bytes, detecting the kind from the name and content.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, PageFailure> {
        let name = name.into();
        let kind = detect_kind(&name, &bytes)?;
        Ok(Self { name, kind, bytes })
    }

    /// Read a local file, detecting the kind from extension and magic bytes.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PageFailure> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let bytes = std::fs::read(path).map_err(|e| PageFailure::DocumentDecode {
            file: name.clone(),
            detail: format!("read failed: {e}"),
        })?;

        debug!("Read {} ({} bytes)", path.display(), bytes.len());
        Self::from_bytes(name, bytes)
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a path or URL to a [`SourceDocument`].
///
/// URLs are downloaded fully into memory; local paths are read from disk.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<SourceDocument, PageFailure> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        SourceDocument::from_path(input)
    }
}

/// Download a URL into memory and wrap it as a [`SourceDocument`].
async fn download_url(url: &str, timeout_secs: u64) -> Result<SourceDocument, PageFailure> {
    info!("Downloading document from: {}", url);
    let name = filename_from_url(url);

    let decode_err = |detail: String| PageFailure::DocumentDecode {
        file: name.clone(),
        detail,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| decode_err(format!("http client: {e}")))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| decode_err(format!("download failed: {e}")))?;

    if !response.status().is_success() {
        return Err(decode_err(format!("HTTP {}", response.status())));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| decode_err(format!("download failed: {e}")))?;

    SourceDocument::from_bytes(name, bytes.to_vec())
}

/// Extract a reasonable filename from the URL path.
fn filename_from_url(url: &str) -> String {
    url.rsplit('/')
        .next()
        .filter(|last| !last.is_empty() && last.contains('.'))
        .map(|last| last.split(['?', '#']).next().unwrap_or(last).to_string())
        .unwrap_or_else(|| "download.pdf".to_string())
}

/// Decide the [`SourceKind`] from the file name, verified against content.
fn detect_kind(name: &str, bytes: &[u8]) -> Result<SourceKind, PageFailure> {
    let ext = name
        .rsplit('.')
        .next()
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let claimed = match ext.as_str() {
        "pdf" => Some(SourceKind::Pdf),
        "jpg" | "jpeg" | "png" => Some(SourceKind::Image),
        _ => None,
    };
    let sniffed = sniff_kind(bytes);

    match (claimed, sniffed) {
        // Extension and content agree, or the extension is unknown but the
        // content is recognisable.
        (Some(k), Some(s)) if k == s => Ok(k),
        (None, Some(s)) => Ok(s),
        (Some(_), Some(s)) => {
            debug!("'{name}': extension disagrees with content, trusting content");
            Ok(s)
        }
        _ => Err(PageFailure::DocumentDecode {
            file: name.to_string(),
            detail: "not a PDF, JPEG, or PNG".to_string(),
        }),
    }
}

/// Identify the format from magic bytes: `%PDF`, JPEG SOI, or PNG signature.
fn sniff_kind(bytes: &[u8]) -> Option<SourceKind> {
    if bytes.starts_with(b"%PDF") {
        Some(SourceKind::Pdf)
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) || bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(SourceKind::Image)
    } else {
        None
    }
}
