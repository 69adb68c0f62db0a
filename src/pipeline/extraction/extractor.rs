//! Extraction orchestrator — turns a stored document into structured data.
//!
//! Picks the text or vision path per document, runs one completion, and
//! parses the reply. Any failure is wrapped into a single error naming the
//! path that failed; retries, if any, belong to the caller.

use std::sync::Arc;

use base64::Engine as _;

use super::parser::parse_extraction_response;
use super::pdf_render::DEFAULT_RENDER_DPI;
use super::prompt::{build_text_prompt, build_vision_prompt, EXTRACTION_SYSTEM_PROMPT};
use super::strategy::{select_path, ExtractionPath, DEFAULT_QUALITY_THRESHOLD};
use super::types::{ExtractionOutcome, LlmClient, PdfRenderer, ReceiptExtractor};
use super::ExtractionError;
use crate::store::StoredDocument;

/// Cap on the text excerpt attached to vision requests and stored as raw_text.
const MAX_EXCERPT_CHARS: usize = 2000;

/// Production extractor: LLM client + PDF renderer behind trait seams.
pub struct LlmReceiptExtractor {
    llm: Arc<dyn LlmClient + Send + Sync>,
    pdf: Arc<dyn PdfRenderer + Send + Sync>,
    quality_threshold: u8,
    vision_fallback: bool,
}

impl LlmReceiptExtractor {
    pub fn new(
        llm: Arc<dyn LlmClient + Send + Sync>,
        pdf: Arc<dyn PdfRenderer + Send + Sync>,
    ) -> Self {
        Self {
            llm,
            pdf,
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            vision_fallback: true,
        }
    }

    pub fn with_vision_fallback(mut self, enabled: bool) -> Self {
        self.vision_fallback = enabled;
        self
    }

    pub fn with_quality_threshold(mut self, threshold: u8) -> Self {
        self.quality_threshold = threshold;
        self
    }

    fn extract_via_vision(&self, bytes: &[u8]) -> Result<ExtractionOutcome, ExtractionError> {
        // Best-effort text excerpt as extra context; its absence never aborts
        // the vision path.
        let excerpt = self
            .pdf
            .extract_text(bytes)
            .ok()
            .map(|t| truncate_excerpt(&t))
            .filter(|t| !t.trim().is_empty());

        let png = self.pdf.render_page_png(bytes, 0, DEFAULT_RENDER_DPI)?;
        let image_base64 = base64::engine::general_purpose::STANDARD.encode(&png);

        let prompt = build_vision_prompt(excerpt.as_deref());
        let response = self
            .llm
            .complete_with_image(EXTRACTION_SYSTEM_PROMPT, &prompt, &image_base64)?;
        let result = parse_extraction_response(&response)?;

        Ok(ExtractionOutcome {
            result,
            raw_text: excerpt.unwrap_or_default(),
            path: ExtractionPath::Vision,
        })
    }

    fn extract_via_text(
        &self,
        document: &StoredDocument,
        bytes: &[u8],
    ) -> Result<ExtractionOutcome, ExtractionError> {
        let text = if is_pdf(document) {
            self.pdf.extract_text(bytes)?
        } else {
            String::from_utf8_lossy(bytes).into_owned()
        };

        if text.trim().is_empty() {
            return Err(ExtractionError::NoText);
        }

        let response = self
            .llm
            .complete(EXTRACTION_SYSTEM_PROMPT, &build_text_prompt(&text))?;
        let result = parse_extraction_response(&response)?;

        Ok(ExtractionOutcome {
            result,
            raw_text: text,
            path: ExtractionPath::Text,
        })
    }
}

impl ReceiptExtractor for LlmReceiptExtractor {
    fn extract(&self, document: &StoredDocument) -> Result<ExtractionOutcome, ExtractionError> {
        let bytes = std::fs::read(&document.path)?;

        let quality = quality_signal(document);
        let path = select_path(quality, self.quality_threshold, self.vision_fallback);

        tracing::info!(
            file = %document.filename,
            size = document.size_bytes,
            path = %path,
            "Starting receipt extraction"
        );

        let outcome = match path {
            ExtractionPath::Vision => self
                .extract_via_vision(&bytes)
                .map_err(|e| wrap_path_error("vision", e))?,
            ExtractionPath::Text => self
                .extract_via_text(document, &bytes)
                .map_err(|e| wrap_path_error("text", e))?,
        };

        tracing::info!(
            file = %document.filename,
            path = %outcome.path,
            merchant = %outcome.result.merchant_name,
            items = outcome.result.items.len(),
            confidence = outcome.result.confidence,
            "Receipt extraction complete"
        );

        Ok(outcome)
    }
}

/// Estimate text-path reliability for a document, 0–100.
///
/// No reliable signal is computable for PDFs (scans carry no trustworthy
/// text layer), so they return `None` and the vision-fallback flag decides.
/// A plain-text document is read verbatim — its signal is exact.
fn quality_signal(document: &StoredDocument) -> Option<u8> {
    if is_pdf(document) {
        None
    } else {
        Some(100)
    }
}

fn is_pdf(document: &StoredDocument) -> bool {
    document
        .path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

fn wrap_path_error(path: &'static str, e: ExtractionError) -> ExtractionError {
    ExtractionError::PathFailed {
        path,
        reason: e.to_string(),
    }
}

fn truncate_excerpt(text: &str) -> String {
    text.chars().take(MAX_EXCERPT_CHARS).collect()
}
