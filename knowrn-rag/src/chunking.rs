//! Text chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`]: fixed-width character windows with overlap
//! - [`RecursiveChunker`]: splits at paragraphs, lines, sentences, then words,
//!   hard-cutting only when no separator is left
//!
//! Sizes are measured in characters, not bytes, so multi-byte text never
//! splits inside a code point.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::config::{ChunkingStrategy, RagConfig, validate_chunking};
use crate::error::Result;

/// Separators tried by [`RecursiveChunker`], coarsest first.
const SEPARATORS: [&str; 6] = ["\n\n", "\n", ".", "!", "?", " "];

/// A strategy for splitting text into bounded, overlapping segments.
///
/// Empty input yields an empty `Vec`. Loaders turn the returned strings into
/// [`Chunk`](crate::document::Chunk)s and assign their IDs.
pub trait Chunker: Send + Sync {
    /// Split `text` into an ordered sequence of segments.
    fn split(&self, text: &str) -> Vec<String>;
}

/// Build the chunker selected by `config.chunking`.
///
/// # Errors
///
/// Returns [`RagError::ConfigError`](crate::RagError::ConfigError) if the
/// size/overlap pair is invalid.
pub fn chunker_for(config: &RagConfig) -> Result<Arc<dyn Chunker>> {
    Ok(match config.chunking {
        ChunkingStrategy::FixedSize => {
            Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap)?)
        }
        ChunkingStrategy::Recursive => {
            Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap)?)
        }
    })
}

/// Splits text into fixed-size windows by character count.
///
/// Window `i` covers characters `[i * step, i * step + chunk_size)` where
/// `step = chunk_size - chunk_overlap`. The last window is the first one that
/// reaches the end of the text, so consecutive windows always share exactly
/// `chunk_overlap` characters.
///
/// # Example
///
/// ```rust,ignore
/// use knowrn_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(800, 100)?;
/// let pieces = chunker.split(&text);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error unless `0 <= chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

impl Chunker for FixedSizeChunker {
    fn split(&self, text: &str) -> Vec<String> {
        fixed_windows(text, self.chunk_size, self.chunk_overlap)
    }
}

fn fixed_windows(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let step = chunk_size.saturating_sub(chunk_overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

/// Splits text at the coarsest separator that keeps segments within budget.
///
/// The text is split at the first separator it contains (`\n\n`, `\n`, `.`,
/// `!`, `?`, space). Pieces smaller than `chunk_size` are merged greedily into
/// chunks, carrying up to `chunk_overlap` characters of trailing pieces into
/// the next chunk. Oversized pieces recurse with the remaining separators and
/// are hard-cut into fixed windows once none is left. Chunks are trimmed and
/// whitespace-only chunks are dropped.
///
/// # Example
///
/// ```rust,ignore
/// use knowrn_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(800, 100)?;
/// let pieces = chunker.split(&text);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error unless `0 <= chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let Some(position) = separators.iter().position(|s| text.contains(s)) else {
            let mut chunks = Vec::new();
            for window in fixed_windows(text.trim(), self.chunk_size, self.chunk_overlap) {
                push_trimmed(&mut chunks, &window);
            }
            return chunks;
        };

        let separator = separators[position];
        let remaining = &separators[position + 1..];

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }
            chunks.extend(self.split_recursive(piece, remaining));
        }

        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }

        chunks
    }

    /// Merge small pieces into chunks of at most `chunk_size` characters.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                let merged: String = window.iter().map(|(p, _)| *p).collect();
                push_trimmed(&mut chunks, &merged);

                // Keep at most `chunk_overlap` characters as the next chunk's prefix.
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some((_, popped)) => total -= popped,
                        None => break,
                    }
                }
            }
            window.push_back((piece, len));
            total += len;
        }

        if !window.is_empty() {
            let merged: String = window.iter().map(|(p, _)| *p).collect();
            push_trimmed(&mut chunks, &merged);
        }

        chunks
    }
}

impl Chunker for RecursiveChunker {
    fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split_recursive(text, &SEPARATORS)
    }
}

/// Split text before each occurrence of `separator`, so the separator opens
/// the following piece.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;

    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            pieces.push(&text[start..pos]);
        }
        start = pos;
    }

    if start < text.len() {
        pieces.push(&text[start..]);
    }

    pieces
}

fn push_trimmed(chunks: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;

    #[test]
    fn fixed_windows_follow_step_formula() {
        let chunker = FixedSizeChunker::new(4, 1).unwrap();
        let chunks = chunker.split("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn fixed_windows_stop_once_text_is_covered() {
        let chunker = FixedSizeChunker::new(8, 4).unwrap();
        let chunks = chunker.split("0123456789");
        assert_eq!(chunks, vec!["01234567", "456789"]);
    }

    #[test]
    fn fixed_windows_count_characters_not_bytes() {
        let chunker = FixedSizeChunker::new(3, 0).unwrap();
        let chunks = chunker.split("héllo wörld");
        assert!(chunks.iter().all(|c| c.chars().count() <= 3));
        assert_eq!(chunks.concat(), "héllo wörld");
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(FixedSizeChunker::new(10, 2).unwrap().split("").is_empty());
        assert!(RecursiveChunker::new(10, 2).unwrap().split("").is_empty());
        assert!(RecursiveChunker::new(10, 2).unwrap().split(" \n\n ").is_empty());
    }

    #[test]
    fn invalid_overlap_is_a_configuration_error() {
        assert!(matches!(FixedSizeChunker::new(10, 10), Err(RagError::ConfigError(_))));
        assert!(matches!(RecursiveChunker::new(10, 20), Err(RagError::ConfigError(_))));
        assert!(matches!(RecursiveChunker::new(0, 0), Err(RagError::ConfigError(_))));
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunker = RecursiveChunker::new(800, 100).unwrap();
        let text = "Topic: Hobby\nInformation: plays ukulele";
        assert_eq!(chunker.split(text), vec![text]);
    }

    #[test]
    fn recursive_prefers_paragraph_boundaries() {
        let chunker = RecursiveChunker::new(30, 0).unwrap();
        let text = "First paragraph here.\n\nSecond paragraph here.";
        let chunks = chunker.split(text);
        assert_eq!(chunks, vec!["First paragraph here.", "Second paragraph here."]);
    }

    #[test]
    fn recursive_falls_back_to_words_then_hard_cut() {
        let chunker = RecursiveChunker::new(10, 0).unwrap();
        let chunks = chunker.split("alpha beta gamma delta supercalifragilistic");
        assert!(chunks.iter().all(|c| c.chars().count() <= 10), "{chunks:?}");
        assert!(chunks.contains(&"alpha beta".to_string()));
        assert!(chunks.iter().any(|c| c.starts_with("supercalif")));
    }

    #[test]
    fn recursive_carries_overlap_between_chunks() {
        let chunker = RecursiveChunker::new(20, 8).unwrap();
        let chunks = chunker.split("one two three four five six seven");
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 20));
        for pair in chunks.windows(2) {
            let last_word = pair[0].split_whitespace().last().unwrap();
            assert!(pair[1].contains(last_word), "no overlap between {pair:?}");
        }
    }

    #[test]
    fn split_keeping_separator_attaches_separator_to_next_piece() {
        assert_eq!(split_keeping_separator("a.b.c", "."), vec!["a", ".b", ".c"]);
        assert_eq!(split_keeping_separator(".a", "."), vec![".a"]);
    }

    #[test]
    fn chunker_for_respects_strategy() {
        let config = RagConfig::builder()
            .chunk_size(4)
            .chunk_overlap(1)
            .chunking(ChunkingStrategy::FixedSize)
            .build()
            .unwrap();
        let chunker = chunker_for(&config).unwrap();
        assert_eq!(chunker.split("abcdefghij"), vec!["abcd", "defg", "ghij"]);
    }
}
