//! Property tests for the chunking strategies.

use knowrn_rag::chunking::{Chunker, FixedSizeChunker, RecursiveChunker};
use proptest::prelude::*;

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Size and overlap pairs with `overlap < size`.
fn arb_params() -> impl Strategy<Value = (usize, usize)> {
    (2usize..60).prop_flat_map(|size| (Just(size), 0..size))
}

/// Prose-like text: words, sentence ends, line and paragraph breaks, and
/// the occasional multi-byte character.
fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            6 => "[a-zé]{1,12}",
            3 => Just(" ".to_string()),
            1 => Just(". ".to_string()),
            1 => Just("\n".to_string()),
            1 => Just("\n\n".to_string()),
        ],
        0..200,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn fixed_windows_overlap_exactly_and_reassemble(
        (size, overlap) in arb_params(),
        text in arb_text(),
    ) {
        let chunks = FixedSizeChunker::new(size, overlap).unwrap().split(&text);

        if text.is_empty() {
            prop_assert!(chunks.is_empty());
            return Ok(());
        }

        for chunk in &chunks {
            prop_assert!(char_len(chunk) <= size);
        }
        for pair in chunks.windows(2) {
            let head: String = pair[0].chars().skip(char_len(&pair[0]) - overlap).collect();
            let tail: String = pair[1].chars().take(overlap).collect();
            prop_assert_eq!(head, tail);
        }

        let mut rebuilt = chunks[0].clone();
        for chunk in &chunks[1..] {
            rebuilt.extend(chunk.chars().skip(overlap));
        }
        prop_assert_eq!(rebuilt, text);
    }

    #[test]
    fn recursive_chunks_fit_and_are_not_blank(
        (size, overlap) in arb_params(),
        text in arb_text(),
    ) {
        let chunks = RecursiveChunker::new(size, overlap).unwrap().split(&text);

        for chunk in &chunks {
            prop_assert!(char_len(chunk) <= size, "chunk of {} chars exceeds {size}", char_len(chunk));
            prop_assert!(!chunk.trim().is_empty());
            prop_assert_eq!(chunk.trim(), chunk.as_str());
        }
        if text.trim().is_empty() {
            prop_assert!(chunks.is_empty());
        } else {
            prop_assert!(!chunks.is_empty());
        }
    }

    #[test]
    fn chunking_is_deterministic((size, overlap) in arb_params(), text in arb_text()) {
        let chunker = RecursiveChunker::new(size, overlap).unwrap();
        prop_assert_eq!(chunker.split(&text), chunker.split(&text));
    }
}

#[test]
fn overlap_must_be_smaller_than_size() {
    assert!(FixedSizeChunker::new(100, 100).is_err());
    assert!(RecursiveChunker::new(100, 150).is_err());
    assert!(FixedSizeChunker::new(0, 0).is_err());
}
