//! Paragraph chunking for markdown documentation.
//!
//! Splits on blank lines and packs consecutive paragraphs into chunks of at
//! most `max_chars`, dropping fragments shorter than `min_chars` (headings,
//! stray separators).

/// Default maximum characters per chunk.
pub const DEFAULT_MAX_CHARS: usize = 500;

/// Default minimum characters for a chunk to be kept.
pub const DEFAULT_MIN_CHARS: usize = 20;

/// Split `text` into paragraph-packed chunks.
pub fn chunk_paragraphs(text: &str, max_chars: usize, min_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        if current.is_empty() {
            current = paragraph.to_string();
        } else if current.len() + paragraph.len() + 2 <= max_chars {
            current.push_str("\n\n");
            current.push_str(paragraph);
        } else {
            chunks.push(std::mem::replace(&mut current, paragraph.to_string()));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks.retain(|c| c.len() >= min_chars);
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_blank_lines() {
        let text = "First paragraph with enough text here.\n\nSecond paragraph, also long enough to keep.";
        let chunks = chunk_paragraphs(text, 30, DEFAULT_MIN_CHARS);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with("First"));
        assert!(chunks[1].starts_with("Second"));
    }

    #[test]
    fn packs_paragraphs_under_limit() {
        let text = "Alpha paragraph body text.\n\nBeta paragraph body text.";
        let chunks = chunk_paragraphs(text, DEFAULT_MAX_CHARS, DEFAULT_MIN_CHARS);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("Alpha"));
        assert!(chunks[0].contains("Beta"));
    }

    #[test]
    fn drops_short_fragments() {
        // A lone heading never reaches the minimum chunk length.
        assert!(chunk_paragraphs("# Title", DEFAULT_MAX_CHARS, DEFAULT_MIN_CHARS).is_empty());

        // Packed with a real paragraph it rides along instead.
        let text = "# Title\n\nA real paragraph that clears the minimum length easily.";
        let chunks = chunk_paragraphs(text, DEFAULT_MAX_CHARS, DEFAULT_MIN_CHARS);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("real paragraph"));
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(chunk_paragraphs("", DEFAULT_MAX_CHARS, DEFAULT_MIN_CHARS).is_empty());
        assert!(chunk_paragraphs("\n\n\n\n", DEFAULT_MAX_CHARS, DEFAULT_MIN_CHARS).is_empty());
    }

    #[test]
    fn single_oversized_paragraph_kept_whole() {
        let long = "word ".repeat(200);
        let chunks = chunk_paragraphs(&long, DEFAULT_MAX_CHARS, DEFAULT_MIN_CHARS);
        assert_eq!(chunks.len(), 1);
    }
}
