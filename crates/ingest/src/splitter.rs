//! Recursive character splitter.
//!
//! Text is cut on the first separator in `["\n\n", "\n", " ", ""]` that
//! occurs in it; pieces still too long are split again with the remaining
//! separators. Neighbouring pieces are then merged back up to `chunk_size`
//! characters, carrying up to `chunk_overlap` characters into the next chunk.
//! Lengths are counted in `char`s, and no chunk exceeds `chunk_size`.

use capstone_core::document::{DocumentChunk, SourceDocument};

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, Copy)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveSplitter {
    /// `chunk_size` is raised to at least 1 and `chunk_overlap` capped below it.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split every section of `document` independently, numbering chunks
    /// globally in document order.
    pub fn split_document(&self, document: &SourceDocument) -> Vec<DocumentChunk> {
        let mut chunks = Vec::new();
        for section in &document.sections {
            for text in self.split_text(&section.text) {
                let sequence = chunks.len();
                chunks.push(DocumentChunk {
                    id: DocumentChunk::chunk_id(&document.id, sequence),
                    document_id: document.id.clone(),
                    source: document.filename.clone(),
                    page: section.page,
                    sequence,
                    text,
                });
            }
        }
        chunks
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (separator, remaining) = pick_separator(text, separators);

        let splits: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };

        let mut chunks = Vec::new();
        let mut fitting: Vec<String> = Vec::new();
        for piece in splits {
            if char_len(&piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting, separator));
                fitting.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_recursive(&piece, remaining));
            }
        }
        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting, separator));
        }
        chunks
    }

    /// Greedily join pieces up to `chunk_size`, keeping a tail of at most
    /// `chunk_overlap` characters as the start of the next chunk.
    fn merge(&self, pieces: &[String], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut docs = Vec::new();
        let mut window: std::collections::VecDeque<&str> = std::collections::VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            let joined_len = |window_len: usize| if window_len > 0 { sep_len } else { 0 };

            if total + len + joined_len(window.len()) > self.chunk_size {
                if !window.is_empty() {
                    push_trimmed(&mut docs, &join(&window, separator));
                    while total > self.chunk_overlap
                        || (total > 0 && total + len + joined_len(window.len()) > self.chunk_size)
                    {
                        let Some(front) = window.pop_front() else { break };
                        total -= char_len(front) + if window.is_empty() { 0 } else { sep_len };
                    }
                }
            }

            window.push_back(piece.as_str());
            total += len + if window.len() > 1 { sep_len } else { 0 };
        }

        push_trimmed(&mut docs, &join(&window, separator));
        docs
    }
}

fn pick_separator<'a>(text: &str, separators: &'a [&'a str]) -> (&'a str, &'a [&'a str]) {
    for (i, &sep) in separators.iter().enumerate() {
        if sep.is_empty() || text.contains(sep) {
            return (sep, &separators[i + 1..]);
        }
    }
    ("", &[])
}

fn join(window: &std::collections::VecDeque<&str>, separator: &str) -> String {
    window.iter().copied().collect::<Vec<_>>().join(separator)
}

fn push_trimmed(docs: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        docs.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
