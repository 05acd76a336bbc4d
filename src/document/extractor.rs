use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Error reading PDF: {0}")]
    Unreadable(#[source] pdf_extract::OutputError),
    #[error("Error reading PDF: the parser aborted ({0})")]
    ParserPanic(String),
    #[error("Error reading PDF: extraction task failed")]
    TaskFailed(#[source] tokio::task::JoinError),
}

/// Turns raw document bytes into plain text, page texts concatenated in page order.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// `pdf-extract` backed extractor. Image-only pages contribute no text.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        // pdf-extract panics on some malformed inputs instead of returning an error
        let result = panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)));

        match result {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(ExtractionError::Unreadable(e)),
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(ExtractionError::ParserPanic(reason))
            }
        }
    }
}
