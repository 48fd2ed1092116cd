//! Deterministic stand-ins for the context extraction calls.

use crate::text::{normalize_token, ranked_content_words, ranked_phrases, sentences, tokens};

/// Used when the source offers no usable word at all.
const LAST_RESORT_WORD: &str = "lesson";

/// Frequency-ranked content words. Never empty.
pub fn vocabulary(text: &str, limit: usize) -> Vec<String> {
    let mut words: Vec<String> = ranked_content_words(text).into_iter().take(limit).collect();
    if words.is_empty() {
        words = tokens(text)
            .into_iter()
            .map(normalize_token)
            .filter(|w| !w.is_empty() && w.chars().all(char::is_alphabetic))
            .fold(Vec::new(), |mut acc, w| {
                if !acc.contains(&w) {
                    acc.push(w);
                }
                acc
            })
            .into_iter()
            .take(limit)
            .collect();
    }
    if words.is_empty() {
        words.push(LAST_RESORT_WORD.to_string());
    }
    words
}

/// Top phrase-like word pairs, topped up with single content words.
pub fn themes(text: &str, limit: usize) -> Vec<String> {
    let mut themes: Vec<String> = ranked_phrases(text).into_iter().take(limit).collect();
    for word in ranked_content_words(text) {
        if themes.len() >= limit {
            break;
        }
        if !themes.iter().any(|t| t.split(' ').any(|part| part == word)) {
            themes.push(word);
        }
    }
    themes
}

/// First sentences of the source.
pub fn summary(text: &str, sentence_count: usize) -> String {
    sentences(text)
        .into_iter()
        .take(sentence_count)
        .collect::<Vec<_>>()
        .join(" ")
}
