//! Services behind the analysis pipeline.
//!
//! Each submodule implements exactly one transformation so each stays
//! independently testable and swappable.
//!
//! ## Data Flow
//!
//! ```text
//! PDF bytes ──▶ render ──▶ encode ──▶ score ──▶ extract
//!               (pdfium)   (PNG/b64)  (VLM)     (text → feedback)
//! ```
//!
//! 1. [`render`]: rasterise pages; runs in `spawn_blocking` because pdfium
//!    is not async-safe. Also the preview [`crate::services::PdfConverter`].
//! 2. [`encode`]: PNG-encode pages and base64-wrap them for the request body
//! 3. [`score`]: the [`crate::services::Scorer`] backed by an LLM provider
//! 4. [`extract`]: pull the answer text out of a response and parse it

pub mod encode;
pub mod extract;
pub mod render;
pub mod score;
