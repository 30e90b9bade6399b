//! Markdown-aware text chunking.
//!
//! Splits scraped page content into ordered, header-tagged chunks small
//! enough to embed individually while staying coherent for retrieval.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Soft upper bound (characters) on a single chunk's text. Paragraphs are
/// never split mid-sentence to honor this exactly; a single paragraph
/// larger than this still becomes one chunk.
const SOFT_MAX_CHARS: usize = 3000;

/// How the pipeline should interpret the content before chunking it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Markdown,
    Html,
}

impl ContentType {
    /// Infer from a scraped page: markdown content wins when both are present.
    pub fn from_flags(has_markdown: bool) -> Self {
        if has_markdown {
            Self::Markdown
        } else {
            Self::Html
        }
    }
}

/// A single ordered chunk of text with optional markdown-heading context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: u32,
    pub header: Option<String>,
    pub text: String,
}

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(#{1,6})[ \t]+(.+?)[ \t]*$").expect("static regex"));
static BLANK_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("static regex"));

/// Split `text` into ordered chunks. Deterministic for a given input.
///
/// For [`ContentType::Markdown`], splits on ATX headings (`#`..`######`) and
/// further splits each heading's body on paragraph boundaries so no chunk
/// exceeds [`SOFT_MAX_CHARS`]. For [`ContentType::Html`] (or anything else
/// that isn't markdown), the whole input becomes a single chunk with no
/// header, unless it is empty or whitespace-only, in which case no chunks
/// are produced.
pub fn chunk(text: &str, content_type: ContentType) -> Vec<Chunk> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return Vec::new();
    }

    let bodies: Vec<(Option<String>, String)> = match content_type {
        ContentType::Html => vec![(None, normalized)],
        ContentType::Markdown => split_by_headings(&normalized),
    };

    let mut chunks = Vec::new();
    for (header, body) in bodies {
        for paragraph_group in group_paragraphs(&body) {
            if paragraph_group.trim().is_empty() {
                continue;
            }
            chunks.push((header.clone(), paragraph_group));
        }
    }

    chunks
        .into_iter()
        .enumerate()
        .map(|(index, (header, text))| Chunk {
            index: index as u32,
            header,
            text,
        })
        .collect()
}

fn normalize(text: &str) -> String {
    let collapsed = BLANK_RUN_RE.replace_all(text, "\n\n");
    collapsed.trim().to_string()
}

/// Split markdown into `(heading, body)` pairs in document order. Content
/// preceding the first heading (if any) is emitted with `header = None`.
fn split_by_headings(text: &str) -> Vec<(Option<String>, String)> {
    let matches: Vec<_> = HEADING_RE.captures_iter(text).collect();
    if matches.is_empty() {
        return vec![(None, text.to_string())];
    }

    let mut sections = Vec::new();
    let first_heading_start = matches[0].get(0).unwrap().start();
    if first_heading_start > 0 {
        let preamble = text[..first_heading_start].trim();
        if !preamble.is_empty() {
            sections.push((None, preamble.to_string()));
        }
    }

    for (i, capture) in matches.iter().enumerate() {
        let heading_match = capture.get(0).unwrap();
        let header = capture.get(2).unwrap().as_str().trim().to_string();
        let body_start = heading_match.end();
        let body_end = matches
            .get(i + 1)
            .map_or(text.len(), |next| next.get(0).unwrap().start());
        let body = text[body_start..body_end].trim().to_string();
        sections.push((Some(header), body));
    }

    sections
}

/// Group a section's paragraphs into chunks no larger than
/// [`SOFT_MAX_CHARS`], never splitting inside a paragraph.
fn group_paragraphs(body: &str) -> Vec<String> {
    let paragraphs: Vec<&str> = body
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    if paragraphs.is_empty() {
        let trimmed = body.trim();
        return if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        };
    }

    let mut groups = Vec::new();
    let mut current = String::new();

    for paragraph in paragraphs {
        let would_be = if current.is_empty() {
            paragraph.len()
        } else {
            current.len() + 2 + paragraph.len()
        };

        if !current.is_empty() && would_be > SOFT_MAX_CHARS {
            groups.push(std::mem::take(&mut current));
        }

        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }

    if !current.is_empty() {
        groups.push(current);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk("", ContentType::Markdown).is_empty());
        assert!(chunk("   \n\t ", ContentType::Html).is_empty());
    }

    #[test]
    fn html_becomes_a_single_headerless_chunk() {
        let chunks = chunk("<p>hello <b>world</b></p>", ContentType::Html);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert!(chunks[0].header.is_none());
    }

    #[test]
    fn markdown_splits_on_headings_with_header_context() {
        let text = "# Intro\nfirst para\n\n## Details\nsecond para\n\nthird para";
        let chunks = chunk(text, ContentType::Markdown);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].header.as_deref(), Some("Intro"));
        assert_eq!(chunks[0].text, "first para");
        assert_eq!(chunks[1].header.as_deref(), Some("Details"));
        assert!(chunks[1].text.contains("second para"));
        assert!(chunks[1].text.contains("third para"));
    }

    #[test]
    fn preamble_before_first_heading_has_no_header() {
        let text = "intro paragraph\n\n# First\nbody";
        let chunks = chunk(text, ContentType::Markdown);
        assert_eq!(chunks[0].header, None);
        assert_eq!(chunks[0].text, "intro paragraph");
        assert_eq!(chunks[1].header.as_deref(), Some("First"));
    }

    #[test]
    fn large_section_is_split_by_paragraph_without_exceeding_soft_max() {
        let paragraph = "x".repeat(2000);
        let text = format!("# Big\n{paragraph}\n\n{paragraph}\n\n{paragraph}");
        let chunks = chunk(&text, ContentType::Markdown);
        assert!(chunks.len() >= 2);
        for c in &chunks {
            assert!(c.text.len() <= SOFT_MAX_CHARS + paragraph.len());
            assert_eq!(c.header.as_deref(), Some("Big"));
        }
    }

    #[test]
    fn chunking_is_deterministic() {
        let text = "# A\none\n\ntwo\n\n# B\nthree";
        let a = chunk(text, ContentType::Markdown);
        let b = chunk(text, ContentType::Markdown);
        assert_eq!(a, b);
    }

    #[test]
    fn indexes_start_at_zero_and_are_contiguous() {
        let text = "# A\none\n\n# B\ntwo\n\n# C\nthree";
        let chunks = chunk(text, ContentType::Markdown);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index as usize, i);
        }
    }
}
