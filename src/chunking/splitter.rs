//! Overlap-aware splitting of chunk text into embedding-sized pieces
//!
//! Splitting is deterministic: the same input always yields the same
//! split sequence. The split-to-chunk mapping persisted with the vector
//! index depends on reproducible split counts across rebuilds.

use crate::config::SplitterConfig;
use tracing::debug;

/// Text splitter producing overlapping substrings bounded by `chunk_size`
/// characters, preferring paragraph, then sentence, then word boundaries.
/// Never splits inside a multi-byte code point (operates on chars).
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    pub fn new(config: &SplitterConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            chunk_overlap: config.chunk_overlap.min(config.chunk_size.saturating_sub(1)),
        }
    }

    /// Split raw chunk text into an ordered sequence of overlapping pieces.
    ///
    /// Empty or all-whitespace input yields an empty sequence. Input no
    /// longer than `chunk_size` characters is returned verbatim as a
    /// single piece.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        if len <= self.chunk_size {
            return vec![text.to_string()];
        }

        let mut pieces = Vec::new();
        let mut start = 0;
        while start < len {
            let hard_end = (start + self.chunk_size).min(len);
            let end = if hard_end == len {
                len
            } else {
                self.find_split_point(&chars, start, hard_end)
            };

            let piece: String = chars[start..end].iter().collect();
            if !piece.trim().is_empty() {
                pieces.push(piece);
            }

            if end >= len {
                break;
            }
            // Back up by the overlap so consecutive pieces share content
            start = (end - self.chunk_overlap).max(start + 1);
        }

        debug!("split {} chars into {} pieces", len, pieces.len());
        pieces
    }

    /// Find a split point in `(floor, hard_end]`, preferring paragraph
    /// breaks, then sentence ends, then newlines, then word boundaries.
    /// The floor keeps every piece longer than the overlap so the cursor
    /// always advances.
    fn find_split_point(&self, chars: &[char], start: usize, hard_end: usize) -> usize {
        let floor = start + self.chunk_overlap + 1;
        if floor >= hard_end {
            return hard_end;
        }

        // Paragraph break (double newline)
        for i in (floor..hard_end).rev() {
            if chars[i - 1] == '\n' && chars[i] == '\n' {
                return i + 1;
            }
        }

        // Sentence boundary followed by whitespace
        for i in (floor..hard_end).rev() {
            let c = chars[i - 1];
            if (c == '.' || c == '!' || c == '?') && chars[i].is_whitespace() {
                return i;
            }
        }

        // Any newline
        for i in (floor..hard_end).rev() {
            if chars[i - 1] == '\n' {
                return i;
            }
        }

        // Word boundary
        for i in (floor..hard_end).rev() {
            if chars[i - 1].is_whitespace() {
                return i;
            }
        }

        // No boundary found: hard character split
        hard_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(chunk_size: usize, chunk_overlap: usize) -> TextSplitter {
        TextSplitter::new(&SplitterConfig {
            chunk_size,
            chunk_overlap,
        })
    }

    #[test]
    fn test_empty_input_yields_no_splits() {
        let s = splitter(500, 50);
        assert!(s.split("").is_empty());
        assert!(s.split("   \n\t  ").is_empty());
    }

    #[test]
    fn test_short_text_returned_verbatim() {
        let s = splitter(500, 50);
        let text = "A short chunk that fits in one piece.";
        let pieces = s.split(text);
        assert_eq!(pieces, vec![text.to_string()]);
    }

    #[test]
    fn test_exact_size_boundary_is_single_piece() {
        let s = splitter(20, 5);
        let text = "a".repeat(20);
        assert_eq!(s.split(&text).len(), 1);
    }

    #[test]
    fn test_pieces_bounded_by_chunk_size() {
        let s = splitter(50, 10);
        let text = "word ".repeat(100);
        for piece in s.split(&text) {
            assert!(piece.chars().count() <= 50);
        }
    }

    #[test]
    fn test_consecutive_pieces_share_overlap() {
        let s = splitter(50, 10);
        let text = "lorem ipsum dolor sit amet ".repeat(20);
        let pieces = s.split(&text);
        assert!(pieces.len() >= 2);
        for pair in pieces.windows(2) {
            let prev: Vec<char> = pair[0].chars().collect();
            let tail: String = prev[prev.len() - 10..].iter().collect();
            assert!(
                pair[1].starts_with(&tail),
                "piece should start with the previous piece's 10-char tail"
            );
        }
    }

    #[test]
    fn test_prefers_sentence_boundary() {
        let s = splitter(40, 5);
        let text = "First sentence here. Second sentence follows after it and keeps going on.";
        let pieces = s.split(text);
        // The first piece should end right after the sentence terminator
        assert!(pieces[0].trim_end().ends_with('.'));
    }

    #[test]
    fn test_prefers_paragraph_boundary() {
        let s = splitter(60, 5);
        let text = "Opening paragraph with some words in it.\n\nSecond paragraph continues with more words than fit.";
        let pieces = s.split(text);
        assert!(pieces[0].contains("Opening paragraph"));
        assert!(!pieces[0].contains("Second paragraph"));
    }

    #[test]
    fn test_deterministic() {
        let s = splitter(50, 10);
        let text = "determinism matters for index rebuilds ".repeat(15);
        assert_eq!(s.split(&text), s.split(&text));
    }

    #[test]
    fn test_never_splits_multibyte_codepoint() {
        let s = splitter(10, 2);
        let text = "日本語のテキストを分割するテストです。もう少し長くして複数の断片にします。";
        let pieces = s.split(text);
        assert!(pieces.len() >= 2);
        // Reconstructing each piece as a String must not panic and each
        // piece must be valid UTF-8 by construction; verify lengths in chars
        for piece in &pieces {
            assert!(piece.chars().count() <= 10);
        }
    }

    #[test]
    fn test_unbroken_run_falls_back_to_hard_split() {
        let s = splitter(10, 2);
        let text = "x".repeat(35);
        let pieces = s.split(&text);
        assert!(pieces.len() >= 3);
        for piece in &pieces {
            assert!(piece.chars().count() <= 10);
        }
    }
}
