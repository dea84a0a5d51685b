//! Fixed‑length chunking of normalized text.
//!
//! Lengths are counted in `char`s, so a chunk boundary never falls inside
//! a UTF‑8 sequence. Boundaries ignore sentence structure; a match that
//! straddles two chunks may be missed downstream.
use harvest_common::{HarvestError, Result};

/// Ordered chunks of one text. Concatenating them yields the text back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkSequence {
    chunks: Vec<String>,
    max_len: usize,
}

impl ChunkSequence {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk size the sequence was cut with.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn as_slice(&self) -> &[String] {
        &self.chunks
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.chunks
    }
}

/// Reject chunk sizes no text can be split by.
pub fn ensure_chunk_size(max_len: usize) -> Result<()> {
    if max_len == 0 {
        return Err(HarvestError::InvalidConfig(
            "chunk size must be a positive number of characters".to_string(),
        ));
    }
    Ok(())
}

/// Cut `text` into contiguous slices of at most `max_len` chars.
///
/// ```
/// use harvest_web::split;
///
/// let chunks = split("abcdefg", 3).unwrap();
/// assert_eq!(chunks.as_slice(), ["abc", "def", "g"]);
/// assert!(split("", 3).unwrap().is_empty());
/// assert!(split("abc", 0).is_err());
/// ```
pub fn split(text: &str, max_len: usize) -> Result<ChunkSequence> {
    ensure_chunk_size(max_len)?;

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == max_len {
            chunks.push(text[start..idx].to_string());
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(text[start..].to_string());
    }

    Ok(ChunkSequence { chunks, max_len })
}
