//! Pipeline stages for NFS-e field extraction.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. switch rendering backend) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ raster ──▶ encode ──▶ llm ──▶ parse
//! (path/URL) (pdfium)   (base64)  (VLM)   (JSON → record)
//! ```
//!
//! 1. [`input`]  — resolve a user-supplied path or URL into a
//!    [`input::SourceDocument`] (name, kind, bytes)
//! 2. [`raster`] — rasterise PDF pages to JPEG (or pass an image through);
//!    runs in `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`] — base64-wrap each page JPEG for the multimodal request body
//! 4. [`llm`]    — drive the model call with retry/backoff; the only stage
//!    with network I/O
//! 5. [`parse`]  — two-stage decode of the model's response into the 15
//!    contract fields

pub mod encode;
pub mod input;
pub mod llm;
pub mod parse;
pub mod raster;
