use serde::{Deserialize, Serialize};

use super::strategy::ExtractionPath;
use super::ExtractionError;
use crate::store::StoredDocument;

/// Structured data extracted from one receipt document.
///
/// Transient — produced per processing attempt and mapped into the durable
/// `Receipt` by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub merchant_name: String,
    /// ISO `YYYY-MM-DD`.
    pub receipt_date: String,
    pub total_amount: f64,
    /// 3-letter currency code.
    pub currency: String,
    pub items: Vec<ExtractedItem>,
    /// 0–100 self-reported extraction confidence.
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedItem {
    pub name: String,
    pub quantity: f64,
    pub unit_price: Option<f64>,
    pub total_price: f64,
    pub category: Option<String>,
}

/// Full output of one extraction attempt.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub result: ExtractionResult,
    /// Text excerpt read from the document, if any (may be empty).
    pub raw_text: String,
    /// Which path produced the result.
    pub path: ExtractionPath,
}

/// Turns a stored document into structured receipt data.
///
/// Trait seam so the orchestrator stays testable without a live LLM service.
pub trait ReceiptExtractor {
    fn extract(&self, document: &StoredDocument) -> Result<ExtractionOutcome, ExtractionError>;
}

/// Chat-completion client abstraction (allows mocking).
pub trait LlmClient {
    /// One structured-output completion over plain text.
    fn complete(&self, system: &str, prompt: &str) -> Result<String, ExtractionError>;

    /// One multimodal completion with a base64-encoded PNG attachment.
    fn complete_with_image(
        &self,
        system: &str,
        prompt: &str,
        image_base64: &str,
    ) -> Result<String, ExtractionError>;
}

/// PDF rendering and text access abstraction (allows mocking).
pub trait PdfRenderer {
    /// Render one page to PNG bytes at the given DPI.
    fn render_page_png(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError>;

    /// Extract embedded text from every page, concatenated.
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<String, ExtractionError>;
}
