//! Highlight rendering over semantic-diff chunks
//!
//! Converts a response's full text plus the backend's ordered chunk list
//! into a span sequence, splicing emphasis around the chunks marked
//! unique. The chunk list carries no positions, only text; chunks are
//! located by forward substring search from a cursor so repeated
//! substrings match positionally rather than textually.

use crate::backend::HighlightChunk;
use tracing::warn;

/// A renderable slice of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    /// Text common to the compared responses
    Plain(String),
    /// Text unique to this response, rendered emphasized
    Unique(String),
}

impl Span {
    /// The span's text regardless of emphasis
    pub fn text(&self) -> &str {
        match self {
            Span::Plain(text) | Span::Unique(text) => text,
        }
    }

    /// Whether this span is emphasized
    pub fn is_unique(&self) -> bool {
        matches!(self, Span::Unique(_))
    }
}

/// Splice emphasis markers into `original` around the chunks tagged
/// unique.
///
/// The cursor only moves forward: each chunk is searched for at or after
/// the end of the previous match, a chunk that cannot be found there is
/// dropped with a diagnostic, and any gap or trailing text is emitted as
/// plain spans. An empty chunk list returns the original text as one
/// plain span.
pub fn apply_highlights(original: &str, chunks: &[HighlightChunk]) -> Vec<Span> {
    if chunks.is_empty() {
        return vec![Span::Plain(original.to_string())];
    }

    let mut spans = Vec::new();
    let mut cursor = 0;

    for (idx, chunk) in chunks.iter().enumerate() {
        if chunk.text.is_empty() {
            continue;
        }

        let found_at = match original[cursor..].find(&chunk.text) {
            Some(offset) => cursor + offset,
            None => {
                // Out-of-order or overlapping chunks land here; the
                // backend does not guarantee ordering.
                warn!(idx, chunk = %chunk.text, "highlight chunk not found in response text");
                continue;
            }
        };

        if found_at > cursor {
            spans.push(Span::Plain(original[cursor..found_at].to_string()));
        }

        let end = found_at + chunk.text.len();
        let matched = original[found_at..end].to_string();
        spans.push(if chunk.is_unique {
            Span::Unique(matched)
        } else {
            Span::Plain(matched)
        });

        cursor = end;
    }

    if cursor < original.len() {
        spans.push(Span::Plain(original[cursor..].to_string()));
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, is_unique: bool) -> HighlightChunk {
        HighlightChunk {
            text: text.to_string(),
            is_unique,
        }
    }

    fn joined(spans: &[Span]) -> String {
        spans.iter().map(Span::text).collect()
    }

    #[test]
    fn test_empty_chunk_list_returns_text_unchanged() {
        let spans = apply_highlights("Hi there", &[]);
        assert_eq!(spans, vec![Span::Plain("Hi there".to_string())]);
    }

    #[test]
    fn test_unique_chunk_with_trailing_text() {
        let spans = apply_highlights("Hi there", &[chunk("Hi", true)]);
        assert_eq!(
            spans,
            vec![
                Span::Unique("Hi".to_string()),
                Span::Plain(" there".to_string()),
            ]
        );
    }

    #[test]
    fn test_ordered_chunks_reconstruct_original() {
        let original = "alpha beta gamma delta";
        let chunks = [
            chunk("alpha", false),
            chunk("beta", true),
            chunk("delta", true),
        ];
        let spans = apply_highlights(original, &chunks);
        assert_eq!(joined(&spans), original);
        assert_eq!(
            spans,
            vec![
                Span::Plain("alpha".to_string()),
                Span::Plain(" ".to_string()),
                Span::Unique("beta".to_string()),
                Span::Plain(" gamma ".to_string()),
                Span::Unique("delta".to_string()),
            ]
        );
    }

    #[test]
    fn test_repeated_substring_matches_positionally() {
        let original = "yes and yes again";
        let chunks = [chunk("yes", false), chunk("yes", true)];
        let spans = apply_highlights(original, &chunks);
        assert_eq!(joined(&spans), original);
        // The second "yes" must be the one at offset 8, not a re-match
        // of the first occurrence.
        assert_eq!(spans[2], Span::Unique("yes".to_string()));
        assert_eq!(spans[1], Span::Plain(" and ".to_string()));
    }

    #[test]
    fn test_missing_chunk_is_dropped_without_panic() {
        let original = "plain text";
        let chunks = [chunk("absent", true), chunk("text", true)];
        let spans = apply_highlights(original, &chunks);
        assert_eq!(joined(&spans), original);
        assert_eq!(
            spans,
            vec![
                Span::Plain("plain ".to_string()),
                Span::Unique("text".to_string()),
            ]
        );
    }

    #[test]
    fn test_out_of_order_chunk_is_dropped() {
        let original = "one two three";
        // "one" sits before the cursor once "two" matched; the forward
        // search drops it.
        let chunks = [chunk("two", false), chunk("one", true)];
        let spans = apply_highlights(original, &chunks);
        assert_eq!(joined(&spans), original);
        assert!(spans.iter().all(|s| !s.is_unique()));
    }

    #[test]
    fn test_empty_chunk_text_is_skipped() {
        let original = "abc";
        let chunks = [chunk("", true), chunk("abc", true)];
        let spans = apply_highlights(original, &chunks);
        assert_eq!(spans, vec![Span::Unique("abc".to_string())]);
    }

    #[test]
    fn test_full_cover_emits_no_trailing_span() {
        let original = "covered";
        let spans = apply_highlights(original, &[chunk("covered", true)]);
        assert_eq!(spans, vec![Span::Unique("covered".to_string())]);
    }
}
