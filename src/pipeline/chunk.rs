//! Chunking: split page text into overlapping windows that fit the model.
//!
//! The splitter works on characters, not bytes, so `chunk_size` means the
//! same thing for ASCII recipes and for accented or CJK text, and a cut can
//! never land inside a UTF-8 sequence.
//!
//! Within each window it cuts after the last separator of the highest
//! priority present:
//!
//! ```text
//! "\n\n"  paragraph
//! "\n"    line
//! ". "    sentence
//! " "     word
//! (none)  raw characters at the window end
//! ```
//!
//! The separator stays with the chunk before the cut and the next chunk
//! starts `chunk_overlap` characters earlier. A separator is only accepted
//! when the cut lies beyond that overlap, so every step moves forward.

use crate::config::validate_chunking;
use crate::error::ExtractError;
use crate::pipeline::load::{Document, PageMetadata};
use tracing::debug;

/// Separators in priority order.
pub const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// A window of one page's text, ready for extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
    pub metadata: PageMetadata,
    /// Position in the run, counted across all pages.
    pub chunk_index: usize,
    /// Character offset of `content` inside its page.
    pub start: usize,
    /// Leading characters shared with the previous chunk of the same page.
    pub overlap: usize,
}

impl Chunk {
    /// Number of characters in the chunk.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// The part of the chunk not already covered by its predecessor.
    pub fn fresh_content(&self) -> &str {
        match self.content.char_indices().nth(self.overlap) {
            Some((byte, _)) => &self.content[byte..],
            None if self.overlap == 0 => &self.content,
            None => "",
        }
    }
}

/// Character span `[start, end)` of a chunk plus its leading overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub overlap: usize,
}

/// Recursive character splitter with overlap.
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveCharacterSplitter {
    /// Fails with [`ExtractError::InvalidConfig`] when `chunk_size` is zero
    /// or `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ExtractError> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split every document in order. `chunk_index` runs across documents.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for document in documents {
            let chars: Vec<char> = document.content.chars().collect();
            let spans = self.split_chars(&chars);
            debug!(
                "Page {}: {} chars → {} chunks",
                document.metadata.page,
                chars.len(),
                spans.len()
            );
            for span in spans {
                chunks.push(Chunk {
                    content: chars[span.start..span.end].iter().collect(),
                    metadata: document.metadata.clone(),
                    chunk_index: chunks.len(),
                    start: span.start,
                    overlap: span.overlap,
                });
            }
        }
        chunks
    }

    /// Split a single text into owned pieces.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        self.split_chars(&chars)
            .into_iter()
            .map(|span| chars[span.start..span.end].iter().collect())
            .collect()
    }

    /// Compute chunk spans over a character slice.
    pub fn split_chars(&self, chars: &[char]) -> Vec<Span> {
        if chars.iter().all(|c| c.is_whitespace()) {
            return Vec::new();
        }

        let total = chars.len();
        let mut spans = Vec::new();
        let mut start = 0;
        let mut overlap = 0;

        loop {
            if total - start <= self.chunk_size {
                spans.push(Span {
                    start,
                    end: total,
                    overlap,
                });
                break;
            }

            let window_end = start + self.chunk_size;
            let cut = self
                .find_cut(chars, start, window_end)
                .unwrap_or(window_end);
            spans.push(Span {
                start,
                end: cut,
                overlap,
            });

            let next = cut - self.chunk_overlap;
            overlap = cut - next;
            start = next;
        }

        spans
    }

    /// Cut point just after the last separator of the highest priority in
    /// `[start, window_end)` that still lies beyond the overlap.
    fn find_cut(&self, chars: &[char], start: usize, window_end: usize) -> Option<usize> {
        let min_cut = start + self.chunk_overlap;
        SEPARATORS
            .iter()
            .find_map(|sep| last_cut_after(chars, sep, start, window_end, min_cut))
    }
}

fn last_cut_after(
    chars: &[char],
    separator: &str,
    start: usize,
    window_end: usize,
    min_cut: usize,
) -> Option<usize> {
    let sep: Vec<char> = separator.chars().collect();
    if window_end - start < sep.len() {
        return None;
    }
    let mut pos = window_end - sep.len();
    loop {
        let cut = pos + sep.len();
        if cut <= min_cut {
            return None;
        }
        if chars[pos..cut] == sep[..] {
            return Some(cut);
        }
        if pos == start {
            return None;
        }
        pos -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    fn page(n: usize, content: &str) -> Document {
        Document {
            content: content.to_string(),
            metadata: PageMetadata {
                source: "recipe.pdf".into(),
                page: n,
                total_pages: 2,
                title: None,
                author: None,
            },
        }
    }

    fn rebuild(chunks: &[Chunk]) -> String {
        chunks.iter().map(Chunk::fresh_content).collect()
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        let err = RecursiveCharacterSplitter::new(10, 10).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(RecursiveCharacterSplitter::new(0, 0).is_err());
        assert!(RecursiveCharacterSplitter::new(10, 9).is_ok());
    }

    #[test]
    fn short_page_is_one_chunk() {
        let splitter = RecursiveCharacterSplitter::new(100, 20).unwrap();
        let chunks =
            splitter.split_documents(&[page(1, "Pancakes: 2 cups flour, 1 cup milk, 2 eggs")]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Pancakes: 2 cups flour, 1 cup milk, 2 eggs");
        assert_eq!(chunks[0].overlap, 0);
        assert_eq!(chunks[0].metadata.page, 1);
    }

    #[test]
    fn whitespace_only_page_yields_nothing() {
        let splitter = RecursiveCharacterSplitter::new(100, 20).unwrap();
        assert!(splitter.split_documents(&[page(1, " \n\n\t ")]).is_empty());
        assert!(splitter.split_text("").is_empty());
    }

    #[test]
    fn prefers_paragraph_then_line_breaks() {
        let splitter = RecursiveCharacterSplitter::new(12, 2).unwrap();
        let pieces = splitter.split_text("aaaa\n\nbbbb\ncccc dddd");
        assert_eq!(pieces, vec!["aaaa\n\n", "\n\nbbbb\n", "b\ncccc dddd"]);
    }

    #[test]
    fn falls_back_to_raw_characters() {
        let splitter = RecursiveCharacterSplitter::new(4, 1).unwrap();
        let pieces = splitter.split_text("abcdefghij");
        assert_eq!(pieces, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn sentence_break_beats_word_break() {
        let splitter = RecursiveCharacterSplitter::new(16, 0).unwrap();
        let pieces = splitter.split_text("Mix well. Bake it hot");
        assert_eq!(pieces, vec!["Mix well. ", "Bake it hot"]);
    }

    #[test]
    fn chunk_index_runs_across_pages() {
        let splitter = RecursiveCharacterSplitter::new(8, 2).unwrap();
        let chunks = splitter.split_documents(&[
            page(1, "one two three four"),
            page(2, "five six"),
        ]);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
        }
        let last = chunks.last().unwrap();
        assert_eq!(last.metadata.page, 2);
        assert_eq!(last.content, "five six");
        assert_eq!(last.overlap, 0);
    }

    #[test]
    fn multibyte_text_is_split_on_chars() {
        let splitter = RecursiveCharacterSplitter::new(5, 1).unwrap();
        let text = "crème brûlée à la française";
        let chunks = splitter.split_documents(&[page(1, text)]);
        assert!(chunks.iter().all(|c| c.char_len() <= 5));
        assert_eq!(rebuild(&chunks), text);
    }

    mod proptest_chunker {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(500))]

            #[test]
            fn chunks_rebuild_the_page(
                content in "[a-zé .\n]{0,800}",
                chunk_size in 1usize..120,
                overlap_ratio in 0usize..100,
            ) {
                let chunk_overlap = chunk_size * overlap_ratio / 100;
                let splitter = RecursiveCharacterSplitter::new(chunk_size, chunk_overlap).unwrap();
                let chunks = splitter.split_documents(&[page(1, &content)]);
                if content.trim().is_empty() {
                    prop_assert!(chunks.is_empty());
                } else {
                    prop_assert_eq!(rebuild(&chunks), content);
                }
            }

            #[test]
            fn chunks_respect_size_and_overlap(
                content in "\\PC{1,600}",
                chunk_size in 1usize..80,
                overlap_ratio in 0usize..100,
            ) {
                let chunk_overlap = chunk_size * overlap_ratio / 100;
                let splitter = RecursiveCharacterSplitter::new(chunk_size, chunk_overlap).unwrap();
                let chunks = splitter.split_documents(&[page(1, &content)]);
                for (i, chunk) in chunks.iter().enumerate() {
                    prop_assert!(chunk.char_len() <= chunk_size);
                    prop_assert!(chunk.char_len() > chunk.overlap);
                    if i == 0 {
                        prop_assert_eq!(chunk.overlap, 0);
                    } else {
                        prop_assert_eq!(chunk.overlap, chunk_overlap);
                    }
                }
            }

            #[test]
            fn overlap_validation_matches_sizes(
                chunk_size in 0usize..500,
                chunk_overlap in 0usize..500,
            ) {
                let result = RecursiveCharacterSplitter::new(chunk_size, chunk_overlap);
                prop_assert_eq!(result.is_ok(), chunk_size > 0 && chunk_overlap < chunk_size);
            }
        }
    }
}
