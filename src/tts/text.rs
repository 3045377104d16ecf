//! Sentence splitting for chunked generation.

/// Split text into sentences; each sentence becomes one generated chunk.
///
/// Boundaries are `.`, `!`, `?`, newlines and their full-width CJK forms.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        current.push(c);

        if matches!(c, '.' | '!' | '?' | '\n' | '。' | '！' | '？') {
            let trimmed = current.trim().to_string();
            if !trimmed.is_empty() {
                sentences.push(trimmed);
            }
            current.clear();
        }
    }

    // Don't forget remaining text
    let trimmed = current.trim().to_string();
    if !trimmed.is_empty() {
        sentences.push(trimmed);
    }

    sentences
}
