//! Rasterisation: turn a [`SourceDocument`] into ordered page JPEGs.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated thread pool
//! thread designed for blocking operations, preventing the Tokio worker
//! threads from stalling during CPU-heavy rendering.
//!
//! ## Page-fault policy
//!
//! A document that cannot be opened fails as a whole (`Err`). A single page
//! that fails to render is recorded in [`RasterOutput::failures`] and the
//! remaining pages are still produced — one glitchy page must not cost the
//! caller the rest of a multi-page invoice batch.

use crate::config::ExtractionConfig;
use crate::error::PageFailure;
use crate::pipeline::input::{SourceDocument, SourceKind};
use image::codecs::jpeg::JpegEncoder;
use pdfium_render::prelude::*;
use tracing::{debug, info, warn};

/// One rasterised page, ready for encoding into a model request.
///
/// `page_index` values for a document form a contiguous ascending sequence
/// starting at 1, matching physical page order in the source.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub source_name: String,
    /// 1-based physical page number.
    pub page_index: usize,
    /// JPEG-encoded raster. For image inputs these are the original bytes.
    pub data: Vec<u8>,
}

/// Pages plus any per-page render failures (skip-page policy).
#[derive(Debug, Default)]
pub struct RasterOutput {
    pub pages: Vec<PageImage>,
    pub failures: Vec<PageFailure>,
}

/// Rasterise a source document into ordered page images.
///
/// * `Image` inputs yield exactly one page whose data is the original bytes.
/// * `Pdf` inputs yield one JPEG per page, rendered at `config.scale`
///   (≈300 DPI at the default 3×) with the alpha channel discarded.
///   A zero-page PDF yields an empty `pages` vector, which the aggregator
///   reports as "no extractable pages" rather than a fatal error.
///
/// Restartable: each call renders a fresh sequence from the same bytes.
pub async fn rasterize(
    doc: &SourceDocument,
    config: &ExtractionConfig,
) -> Result<RasterOutput, PageFailure> {
    match doc.kind {
        SourceKind::Image => Ok(RasterOutput {
            pages: vec![PageImage {
                source_name: doc.name.clone(),
                page_index: 1,
                data: doc.bytes.clone(),
            }],
            failures: vec![],
        }),
        SourceKind::Pdf => {
            let name = doc.name.clone();
            let bytes = doc.bytes.clone();
            let scale = config.scale;
            let max_pixels = config.max_rendered_pixels;
            let quality = config.jpeg_quality;

            tokio::task::spawn_blocking(move || {
                render_pdf_blocking(&name, &bytes, scale, max_pixels, quality)
            })
            .await
            .map_err(|e| PageFailure::DocumentDecode {
                file: doc.name.clone(),
                detail: format!("render task panicked: {e}"),
            })?
        }
    }
}

/// Blocking implementation of PDF page rendering.
fn render_pdf_blocking(
    name: &str,
    bytes: &[u8],
    scale: f32,
    max_pixels: u32,
    quality: u8,
) -> Result<RasterOutput, PageFailure> {
    let pdfium = Pdfium::default();

    let document =
        pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| PageFailure::DocumentDecode {
                file: name.to_string(),
                detail: format!("{e:?}"),
            })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("'{}': PDF loaded, {} pages", name, total_pages);

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(scale)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut output = RasterOutput::default();

    for idx in 0..total_pages {
        match render_page(&pages, idx, &render_config, quality) {
            Ok(data) => {
                output.pages.push(PageImage {
                    source_name: name.to_string(),
                    page_index: idx + 1,
                    data,
                });
            }
            Err(detail) => {
                warn!("'{}' page {}: render failed — {}", name, idx + 1, detail);
                output.failures.push(PageFailure::RenderFailed {
                    file: name.to_string(),
                    page: idx + 1,
                    detail,
                });
            }
        }
    }

    Ok(output)
}

/// Render one page to JPEG bytes, discarding the alpha channel.
fn render_page(
    pages: &PdfPages<'_>,
    idx: usize,
    render_config: &PdfRenderConfig,
    quality: u8,
) -> Result<Vec<u8>, String> {
    let page = pages.get(idx as u16).map_err(|e| format!("{e:?}"))?;

    let bitmap = page
        .render_with_config(render_config)
        .map_err(|e| format!("{e:?}"))?;

    // RGB8 drops the alpha channel, keeping the encoded size down.
    let rgb = bitmap.as_image().to_rgb8();
    debug!("Rendered page {} → {}x{} px", idx + 1, rgb.width(), rgb.height());

    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder
        .encode_image(&rgb)
        .map_err(|e| format!("JPEG encoding failed: {e}"))?;

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::input::SourceDocument;

    #[tokio::test]
    async fn image_input_passes_through_as_single_page() {
        let bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3];
        let doc = SourceDocument::from_bytes("nota.jpg", bytes.clone()).unwrap();
        let config = ExtractionConfig::default();

        let out = rasterize(&doc, &config).await.unwrap();
        assert_eq!(out.pages.len(), 1);
        assert_eq!(out.pages[0].page_index, 1);
        assert_eq!(out.pages[0].source_name, "nota.jpg");
        assert_eq!(out.pages[0].data, bytes);
        assert!(out.failures.is_empty());
    }

    #[tokio::test]
    async fn rasterize_is_restartable() {
        let doc =
            SourceDocument::from_bytes("nota.png", b"\x89PNG\r\n\x1a\nabc".to_vec()).unwrap();
        let config = ExtractionConfig::default();

        let first = rasterize(&doc, &config).await.unwrap();
        let second = rasterize(&doc, &config).await.unwrap();
        assert_eq!(first.pages[0].data, second.pages[0].data);
    }
}
