//! Fixed-window text splitting.
//!
//! Windows are measured in characters, never bytes, so a chunk boundary
//! cannot fall inside a UTF-8 code point.

use crate::error::{RagError, Result};

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default number of characters shared by consecutive windows.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Splits text into overlapping fixed-size windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSplitter {
    chunk_size: usize,
    overlap: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl TextSplitter {
    /// Create a splitter.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `chunk_size` is zero or `overlap` is not
    /// smaller than `chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::InvalidInput(
                "chunk size must be positive".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(RagError::InvalidInput(format!(
                "overlap {overlap} must be smaller than chunk size {chunk_size}"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Window size in characters.
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap in characters.
    #[must_use]
    pub const fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into windows.
    ///
    /// Text no longer than one window comes back unchanged as the only chunk,
    /// including the empty string.
    #[must_use]
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= self.chunk_size {
            return vec![text.to_string()];
        }

        let step = self.chunk_size - self.overlap;
        let mut chunks = Vec::with_capacity(chars.len() / step + 1);
        let mut start = 0;

        loop {
            let end = (start + self.chunk_size).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(len: usize) -> String {
        (0..len)
            .map(|i| char::from(b'a' + u8::try_from(i % 26).unwrap()))
            .collect()
    }

    #[test]
    fn short_text_is_returned_as_is() {
        let splitter = TextSplitter::default();
        let text = numbered(1000);
        assert_eq!(splitter.split(&text), vec![text]);
    }

    #[test]
    fn empty_text_yields_one_empty_chunk() {
        assert_eq!(TextSplitter::default().split(""), vec![String::new()]);
    }

    #[test]
    fn fifteen_hundred_chars_yield_two_windows() {
        let splitter = TextSplitter::default();
        let text = numbered(1500);
        let chars: Vec<char> = text.chars().collect();

        let chunks = splitter.split(&text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], chars[0..1000].iter().collect::<String>());
        assert_eq!(chunks[1], chars[800..1500].iter().collect::<String>());
    }

    #[test]
    fn consecutive_chunks_share_overlap() {
        let splitter = TextSplitter::new(100, 30).unwrap();
        let text = numbered(1234);
        let chunks = splitter.split(&text);

        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].chars().collect();
            let next: Vec<char> = pair[1].chars().collect();
            assert_eq!(prev.len(), 100);
            assert_eq!(&prev[70..], &next[..30]);
        }

        let last = chunks.last().unwrap();
        assert!(text.ends_with(last.as_str()));
    }

    #[test]
    fn splits_on_characters_not_bytes() {
        let splitter = TextSplitter::new(4, 1).unwrap();
        let chunks = splitter.split("éééééééé");
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
        assert_eq!(chunks[0], "éééé");
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(TextSplitter::new(100, 100).is_err());
        assert!(TextSplitter::new(100, 150).is_err());
        assert!(TextSplitter::new(0, 0).is_err());
    }
}
