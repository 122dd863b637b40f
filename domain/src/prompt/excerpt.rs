//! Byte-bounded excerpts of evidence and query text

/// Bytes of chunk content shown to the evaluator
pub const EVIDENCE_PREVIEW_BYTES: usize = 300;

/// Cut `text` to at most `max_bytes`, backing up to the previous char
/// boundary so multi-byte content is never split.
pub fn excerpt(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Chunk content as the evaluator sees it.
pub fn preview(content: &str) -> &str {
    excerpt(content, EVIDENCE_PREVIEW_BYTES)
}
