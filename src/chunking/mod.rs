//! Text chunking for review ingestion.
//!
//! Splits raw review dumps into pieces of at most `chunk_size` characters,
//! preferring paragraph, then line, then word boundaries, and only cutting
//! inside a word when nothing else fits.

use regex::Regex;
use std::collections::VecDeque;
use std::sync::LazyLock;

/// Boundaries tried in order; the empty separator splits into characters.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r\n|\r|\n").expect("line-break pattern is valid"));

/// Replace every line break with ". " so one review per line becomes running text.
pub fn flatten_line_breaks(text: &str) -> String {
    LINE_BREAKS.replace_all(text, ". ").into_owned()
}

/// Recursive character splitter.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    /// Create a chunker. `chunk_overlap` is clamped below `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    /// Split `text` into trimmed, non-empty chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with(text, &SEPARATORS)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let position = separators
            .iter()
            .position(|s| s.is_empty() || text.contains(s))
            .unwrap_or(separators.len() - 1);
        let separator = separators[position];
        let remaining = &separators[position + 1..];

        let pieces: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        };

        let mut chunks = Vec::new();
        let mut small = Vec::new();

        for piece in pieces {
            if char_len(&piece) <= self.chunk_size {
                small.push(piece);
                continue;
            }

            if !small.is_empty() {
                chunks.extend(self.merge(&small, separator));
                small.clear();
            }

            if remaining.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_with(&piece, remaining));
            }
        }

        if !small.is_empty() {
            chunks.extend(self.merge(&small, separator));
        }

        chunks
    }

    /// Greedily join pieces up to `chunk_size`, carrying up to `chunk_overlap`
    /// characters of trailing pieces into the next chunk.
    fn merge(&self, pieces: &[String], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            let len = char_len(piece);
            let joined_len = |window: &VecDeque<&str>, total: usize| {
                total + len + if window.is_empty() { 0 } else { sep_len }
            };

            if joined_len(&window, total) > self.chunk_size && !window.is_empty() {
                push_trimmed(&mut chunks, &window, separator);

                while total > self.chunk_overlap
                    || (joined_len(&window, total) > self.chunk_size && total > 0)
                {
                    let Some(front) = window.pop_front() else { break };
                    total -= char_len(front) + if window.is_empty() { 0 } else { sep_len };
                }
            }

            total += len + if window.is_empty() { 0 } else { sep_len };
            window.push_back(piece);
        }

        push_trimmed(&mut chunks, &window, separator);
        chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_trimmed(chunks: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunker = TextChunker::new(2000, 0);
        let chunks = chunker.split("Great phone.\nBattery lasts two days.");
        assert_eq!(chunks, vec!["Great phone.\nBattery lasts two days.".to_string()]);
    }

    #[test]
    fn test_splits_on_paragraphs_first() {
        let chunker = TextChunker::new(20, 0);
        let chunks = chunker.split("first review here\n\nsecond review here");
        assert_eq!(chunks, vec!["first review here", "second review here"]);
    }

    #[test]
    fn test_chunks_respect_size() {
        let chunker = TextChunker::new(10, 0);
        let text = "one two three four five six seven eight nine ten";
        let chunks = chunker.split(text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 10, "chunk too long: {:?}", chunk);
        }
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn test_overlap_repeats_trailing_words() {
        let chunker = TextChunker::new(11, 5);
        let chunks = chunker.split("aaa bbb ccc ddd");
        assert_eq!(chunks, vec!["aaa bbb ccc", "ccc ddd"]);
    }

    #[test]
    fn test_long_word_is_cut_by_characters() {
        let chunker = TextChunker::new(4, 0);
        let chunks = chunker.split("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_multibyte_text() {
        let chunker = TextChunker::new(3, 0);
        let chunks = chunker.split("ñañañ");
        assert_eq!(chunks, vec!["ñañ", "añ"]);
    }

    #[test]
    fn test_whitespace_only_yields_nothing() {
        let chunker = TextChunker::new(10, 0);
        assert!(chunker.split("   \n\n  ").is_empty());
    }

    #[test]
    fn test_flatten_line_breaks() {
        assert_eq!(
            flatten_line_breaks("Good value\r\nBad screen\nNice\rOk"),
            "Good value. Bad screen. Nice. Ok"
        );
    }
}
