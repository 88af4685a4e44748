//! Error types for the recognition boundary.

use std::time::Duration;

use thiserror::Error;

/// Failure of one recognition pass. Always caught by the orchestrator.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("pass '{pass}' timed out after {timeout:?}")]
    Timeout { pass: String, timeout: Duration },

    #[error("OCR sidecar request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OCR sidecar error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("OCR process failed: {0}")]
    Process(String),

    #[error("I/O error talking to OCR engine: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not decode OCR output: {0}")]
    Decode(String),

    #[error("pass '{0}' returned no text")]
    EmptyText(String),
}

/// Rejected input image.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image is empty")]
    Empty,

    #[error("unsupported image data: {0}")]
    Unsupported(String),
}
