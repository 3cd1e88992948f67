//! Image encoding: page JPEG bytes → base64 `ImageData`.
//!
//! VLM APIs (OpenAI, Anthropic, Gemini) accept images as base64 data-URIs
//! embedded in the JSON request body. Pages are already JPEG at this point —
//! the rasteriser encodes PDF renders and image inputs pass through their
//! original bytes — so this stage only wraps them for the wire.
//! `detail: "high"` instructs GPT-4-class models to use the full image tile
//! budget; without it the small print (CNPJ digits, tax tables) is lost.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use tracing::debug;

use crate::pipeline::raster::PageImage;

/// Wrap a rasterised page as base64 JPEG data ready for the model API.
pub fn encode_page(page: &PageImage) -> ImageData {
    let b64 = STANDARD.encode(&page.data);
    debug!(
        "Encoded '{}' page {} → {} bytes base64",
        page.source_name,
        page.page_index,
        b64.len()
    );

    ImageData::new(b64, "image/jpeg").with_detail("high")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_wraps_bytes_as_base64_jpeg() {
        let page = PageImage {
            source_name: "nota.jpg".into(),
            page_index: 1,
            data: vec![0xFF, 0xD8, 0xFF, 0xE0],
        };
        let data = encode_page(&page);
        assert_eq!(data.mime_type, "image/jpeg");
        assert!(!data.data.is_empty());
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(decoded, page.data);
    }
}
