//! PDF page rendering via Google PDFium.
//!
//! Renders a receipt page to PNG for the vision extraction path and reads
//! embedded text for the cheap text path.
//!
//! `PdfiumRenderer` is stateless (`Send + Sync`). Each operation creates
//! a fresh `Pdfium` instance because the upstream type is `!Send`.
//! The OS caches `dlopen`/`LoadLibrary` calls, so repeat loads are near-free.

use std::io::Cursor;

use image::ImageOutputFormat;
use pdfium_render::prelude::*;
use tracing::debug;

use super::types::PdfRenderer;
use super::ExtractionError;

/// Maximum dimension (width or height) for rendered page images.
/// Prevents OOM on extremely large pages or absurd DPI settings.
const MAX_DIMENSION_PX: u32 = 4096;

/// Default rendering DPI for vision extraction.
/// 200 DPI balances legibility of small receipt print against payload size.
pub const DEFAULT_RENDER_DPI: u32 = 200;

/// PDF points per inch (standard PDF unit).
const POINTS_PER_INCH: f32 = 72.0;

/// Renders PDF pages to PNG images using Google PDFium.
///
/// Stateless: the `Pdfium` library handle is loaded per-operation because
/// the upstream `Pdfium` type is `!Send + !Sync`.
pub struct PdfiumRenderer;

impl PdfiumRenderer {
    /// Create a new renderer, verifying the PDFium library is loadable.
    ///
    /// Discovery order:
    /// 1. `PDFIUM_DYNAMIC_LIB_PATH` env var (explicit path to library file)
    /// 2. Alongside the running executable
    /// 3. System library search paths
    pub fn new() -> Result<Self, ExtractionError> {
        // Verify library is loadable at construction time (fail-fast).
        let _ = load_pdfium()?;
        Ok(Self)
    }
}

/// Load the PDFium dynamic library.
fn load_pdfium() -> Result<Pdfium, ExtractionError> {
    // 1. Explicit path via env var
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        debug!(path = %path, "Loading PDFium from env var");
        let bindings = Pdfium::bind_to_library(&path).map_err(|e| {
            ExtractionError::PdfRendering(format!("Failed to load PDFium from {path}: {e}"))
        })?;
        return Ok(Pdfium::new(bindings));
    }

    // 2. Alongside the executable (dev / portable installs).
    // pdfium_platform_library_name_at_path() handles platform-specific names:
    //   Windows → pdfium.dll | Linux → libpdfium.so | macOS → libpdfium.dylib
    if let Ok(exe) = std::env::current_exe() {
        if let Some(exe_dir) = exe.parent() {
            let lib_path =
                Pdfium::pdfium_platform_library_name_at_path(exe_dir.to_string_lossy().as_ref());
            if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
                debug!(dir = %exe_dir.display(), "Loaded PDFium from executable directory");
                return Ok(Pdfium::new(bindings));
            }
        }
    }

    // 3. System library
    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        ExtractionError::PdfRendering(format!(
            "PDFium library not found. Set PDFIUM_DYNAMIC_LIB_PATH or install PDFium: {e}"
        ))
    })?;
    Ok(Pdfium::new(bindings))
}

/// Map PDF load errors — detect encrypted PDFs for user-friendly messaging.
fn map_load_error(e: PdfiumError) -> ExtractionError {
    let msg = format!("{e}");
    let lower = msg.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        ExtractionError::PdfEncrypted
    } else {
        ExtractionError::PdfRendering(format!("Failed to load PDF: {e}"))
    }
}

/// Compute pixel dimensions for rendering, applying the dimension guard.
///
/// Returns (width_px, height_px), both clamped to [1, MAX_DIMENSION_PX].
/// Preserves aspect ratio when capping.
fn compute_render_dimensions(width_points: f32, height_points: f32, dpi: u32) -> (u32, u32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let raw_w = (width_points * scale).max(1.0);
    let raw_h = (height_points * scale).max(1.0);

    let max_dim = raw_w.max(raw_h);
    if max_dim > MAX_DIMENSION_PX as f32 {
        let ratio = MAX_DIMENSION_PX as f32 / max_dim;
        let w = ((raw_w * ratio) as u32).clamp(1, MAX_DIMENSION_PX);
        let h = ((raw_h * ratio) as u32).clamp(1, MAX_DIMENSION_PX);
        (w, h)
    } else {
        (raw_w as u32, raw_h as u32)
    }
}

impl PdfRenderer for PdfiumRenderer {
    fn render_page_png(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(map_load_error)?;

        let pages = document.pages();
        let page = pages.get(page_index as u16).map_err(|_| {
            ExtractionError::PdfRendering(format!(
                "Page {} not found (PDF has {} pages)",
                page_index,
                pages.len()
            ))
        })?;

        let (width, height) =
            compute_render_dimensions(page.width().value, page.height().value, dpi);

        let config = PdfRenderConfig::new()
            .set_target_width(width as i32)
            .set_maximum_height(height as i32);

        let bitmap = page.render_with_config(&config).map_err(|e| {
            ExtractionError::PdfRendering(format!("Failed to render page {page_index}: {e}"))
        })?;

        let img = bitmap.as_image();
        let mut png_buf = Cursor::new(Vec::new());
        img.write_to(&mut png_buf, ImageOutputFormat::Png)
            .map_err(|e| ExtractionError::ImageProcessing(format!("Failed to encode PNG: {e}")))?;

        debug!(
            page = page_index,
            width,
            height,
            png_size = png_buf.get_ref().len(),
            "Rendered PDF page to PNG"
        );

        Ok(png_buf.into_inner())
    }

    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<String, ExtractionError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(map_load_error)?;

        let mut text = String::new();
        for page in document.pages().iter() {
            let page_text = page.text().map_err(|e| {
                ExtractionError::PdfRendering(format!("Failed to read page text: {e}"))
            })?;
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&page_text.all());
        }

        Ok(text)
    }
}

// ── MockPdfRenderer (testing) ───────────────────────────────

/// Mock renderer returning configurable PNG bytes and page text.
pub struct MockPdfRenderer {
    png_bytes: Vec<u8>,
    text: Result<String, String>,
}

impl MockPdfRenderer {
    pub fn new(png_bytes: &[u8], text: &str) -> Self {
        Self {
            png_bytes: png_bytes.to_vec(),
            text: Ok(text.to_string()),
        }
    }

    /// A renderer whose text extraction fails (render still succeeds).
    pub fn with_text_failure(mut self, message: &str) -> Self {
        self.text = Err(message.to_string());
        self
    }
}

impl PdfRenderer for MockPdfRenderer {
    fn render_page_png(
        &self,
        _pdf_bytes: &[u8],
        _page_index: usize,
        _dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError> {
        Ok(self.png_bytes.clone())
    }

    fn extract_text(&self, _pdf_bytes: &[u8]) -> Result<String, ExtractionError> {
        match &self.text {
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(ExtractionError::PdfRendering(message.clone())),
        }
    }
}
