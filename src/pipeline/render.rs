//! PDF rasterisation via pdfium, and the preview [`PdfConverter`].
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and must not run on async worker threads. Rendering happens on the
//! blocking pool so uploads and scoring calls elsewhere keep making progress.
//!
//! ## Why cap pixels, not DPI?
//!
//! Page sizes vary; `max_pixels` caps the longest edge regardless of the
//! physical size, keeping memory bounded.

use crate::config::AnalyzerConfig;
use crate::error::ServiceError;
use crate::pipeline::encode;
use crate::services::{ConvertedImage, PdfConverter, UploadFile, PNG_MIME};
use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

/// Rasterise the first `max_pages` pages of a PDF into PNG bytes.
pub async fn render_pages_png(
    pdf: Vec<u8>,
    max_pixels: u32,
    password: Option<String>,
    max_pages: usize,
) -> Result<Vec<Vec<u8>>, ServiceError> {
    tokio::task::spawn_blocking(move || {
        let images = render_pages_blocking(&pdf, max_pixels, password.as_deref(), max_pages)?;
        images
            .iter()
            .map(|img| {
                encode::encode_png(img)
                    .map_err(|e| ServiceError::Render(format!("PNG encoding failed: {e}")))
            })
            .collect()
    })
    .await
    .map_err(|e| ServiceError::Internal(format!("Render task panicked: {e}")))?
}

/// Blocking implementation of page rendering.
fn render_pages_blocking(
    pdf: &[u8],
    max_pixels: u32,
    password: Option<&str>,
    max_pages: usize,
) -> Result<Vec<DynamicImage>, ServiceError> {
    let pdfium = Pdfium::default();

    let document = pdfium.load_pdf_from_byte_slice(pdf, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            ServiceError::Render(if password.is_some() {
                "wrong PDF password".to_string()
            } else {
                "PDF is encrypted and requires a password".to_string()
            })
        } else {
            ServiceError::Render(format!("PDF is corrupt: {err_str}"))
        }
    })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    if total_pages == 0 {
        return Err(ServiceError::Render("PDF has no pages".into()));
    }
    info!("PDF loaded: {} pages", total_pages);

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let count = total_pages.min(max_pages.max(1));
    let mut results = Vec::with_capacity(count);

    for idx in 0..count {
        let page = pages
            .get(idx as u16)
            .map_err(|e| ServiceError::Render(format!("page {}: {:?}", idx + 1, e)))?;

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| ServiceError::Render(format!("page {}: {:?}", idx + 1, e)))?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        results.push(image);
    }

    Ok(results)
}

/// Preview file name for an uploaded PDF: `cv.pdf` → `cv.png`.
pub fn preview_name(pdf_name: &str) -> String {
    let stem = Path::new(pdf_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("resume");
    format!("{stem}.png")
}

/// Renders page 1 of a resume as its PNG preview.
#[derive(Debug, Clone)]
pub struct PdfiumConverter {
    max_pixels: u32,
    password: Option<String>,
}

impl PdfiumConverter {
    pub fn new(max_pixels: u32) -> Self {
        Self {
            max_pixels,
            password: None,
        }
    }

    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self {
            max_pixels: config.preview_max_pixels,
            password: config.pdf_password.clone(),
        }
    }
}

#[async_trait]
impl PdfConverter for PdfiumConverter {
    async fn convert_pdf_to_image(&self, file: &UploadFile) -> ConvertedImage {
        match render_pages_png(file.bytes.clone(), self.max_pixels, self.password.clone(), 1).await
        {
            Ok(mut pages) if !pages.is_empty() => {
                let png = pages.swap_remove(0);
                debug!("Preview for '{}': {} bytes", file.name, png.len());
                ConvertedImage::ok(UploadFile::new(preview_name(&file.name), PNG_MIME, png))
            }
            Ok(_) => ConvertedImage::failed("PDF rendered no pages"),
            Err(e) => {
                warn!("Failed to convert '{}' to image: {}", file.name, e);
                ConvertedImage::failed(e.to_string())
            }
        }
    }
}
