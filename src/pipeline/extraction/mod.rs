pub mod types;
pub mod strategy;
pub mod prompt;
pub mod parser;
pub mod client;
pub mod pdf_render;
pub mod extractor;

pub use types::*;
pub use strategy::*;
pub use prompt::*;
pub use parser::*;
pub use client::*;
pub use pdf_render::*;
pub use extractor::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Extraction service not reachable at {0}")]
    Connection(String),

    #[error("Extraction service returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Empty completion from extraction service")]
    EmptyCompletion,

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Malformed extraction response: {0}")]
    MalformedResponse(String),

    #[error("Incomplete extraction — missing or invalid fields: {0}")]
    IncompleteExtraction(String),

    #[error("No extractable text in document")]
    NoText,

    #[error("PDF rendering failed: {0}")]
    PdfRendering(String),

    #[error("PDF is password-protected — decrypt it first")]
    PdfEncrypted,

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("{path} extraction path failed: {reason}")]
    PathFailed { path: &'static str, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
