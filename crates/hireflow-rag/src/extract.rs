//! Plain-text extraction from uploaded files.

use crate::error::{RagError, Result};

/// Pulls plain text out of raw file bytes.
pub trait TextExtractor: Send + Sync {
    /// Whether an extractor exists for `mime_type`.
    fn supports(&self, mime_type: &str) -> bool;

    /// Extract text from `bytes`.
    ///
    /// # Errors
    ///
    /// Returns `Extraction` if the MIME type is unsupported or the bytes
    /// cannot be decoded.
    fn extract(&self, mime_type: &str, bytes: &[u8]) -> Result<String>;
}

/// Strip parameters such as `; charset=utf-8` and lowercase.
fn essence(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Extractor for PDF, plain text and markdown.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTextExtractor;

impl DefaultTextExtractor {
    const PDF: &'static str = "application/pdf";
    const TEXT: [&'static str; 3] = ["text/plain", "text/markdown", "text/x-markdown"];
}

impl TextExtractor for DefaultTextExtractor {
    fn supports(&self, mime_type: &str) -> bool {
        let essence = essence(mime_type);
        essence == Self::PDF || Self::TEXT.contains(&essence.as_str())
    }

    fn extract(&self, mime_type: &str, bytes: &[u8]) -> Result<String> {
        let essence = essence(mime_type);

        if essence == Self::PDF {
            return pdf_extract::extract_text_from_mem(bytes)
                .map_err(|e| RagError::Extraction(format!("PDF: {e}")));
        }

        if Self::TEXT.contains(&essence.as_str()) {
            return String::from_utf8(bytes.to_vec())
                .map_err(|_| RagError::Extraction("text is not valid UTF-8".to_string()));
        }

        Err(RagError::Extraction(format!(
            "no extractor for {mime_type}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supports_known_types() {
        let extractor = DefaultTextExtractor;
        assert!(extractor.supports("application/pdf"));
        assert!(extractor.supports("text/plain; charset=utf-8"));
        assert!(extractor.supports("Text/Markdown"));
        assert!(!extractor.supports("image/png"));
        assert!(!extractor.supports("application/msword"));
    }

    #[test]
    fn extracts_plain_text() {
        let text = DefaultTextExtractor
            .extract("text/plain", "Senior Rust engineer".as_bytes())
            .unwrap();
        assert_eq!(text, "Senior Rust engineer");
    }

    #[test]
    fn rejects_invalid_utf8() {
        let result = DefaultTextExtractor.extract("text/markdown", &[0xff, 0xfe, 0xfd]);
        assert!(matches!(result, Err(RagError::Extraction(_))));
    }

    #[test]
    fn rejects_corrupt_pdf() {
        let result = DefaultTextExtractor.extract("application/pdf", b"not a pdf");
        assert!(matches!(result, Err(RagError::Extraction(_))));
    }

    #[test]
    fn rejects_unsupported_type() {
        let result = DefaultTextExtractor.extract("image/png", &[0x89, 0x50]);
        assert!(matches!(result, Err(RagError::Extraction(_))));
    }
}
