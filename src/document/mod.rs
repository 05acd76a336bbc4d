mod extractor;

pub use extractor::{ExtractionError, PdfTextExtractor, TextExtractor};

/// One uploaded file, held in memory for the lifetime of a submission.
#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Checks the filename extension, the same gate the upload form applies.
    pub fn has_pdf_extension(&self) -> bool {
        std::path::Path::new(&self.filename)
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("pdf"))
            .unwrap_or(false)
    }
}
