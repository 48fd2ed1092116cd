//! Text heuristics shared by the content gate and the shared-context fallbacks.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

static SENTENCE_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?]+[.!?]+|[^.!?]+$").expect("valid sentence regex"));

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and",
        "any", "are", "as", "at", "be", "because", "been", "before", "being", "below",
        "between", "both", "but", "by", "can", "could", "did", "do", "does", "doing", "down",
        "during", "each", "even", "few", "for", "from", "further", "had", "has", "have",
        "having", "he", "her", "here", "hers", "him", "his", "how", "i", "if", "in", "into",
        "is", "it", "its", "itself", "just", "many", "may", "me", "might", "more", "most",
        "much", "must", "my", "no", "nor", "not", "now", "of", "off", "on", "once", "one",
        "only", "or", "other", "our", "ours", "out", "over", "own", "same", "she", "should",
        "so", "some", "still", "such", "than", "that", "the", "their", "theirs", "them",
        "then", "there", "these", "they", "this", "those", "through", "to", "too", "under",
        "until", "up", "upon", "us", "very", "was", "we", "were", "what", "when", "where",
        "which", "while", "who", "whom", "why", "will", "with", "would", "yet", "you", "your",
        "yours", "said", "says", "like", "well", "get", "got", "make", "made",
    ]
    .into_iter()
    .collect()
});

/// Whitespace-separated tokens.
pub fn tokens(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Lowercased token with surrounding punctuation removed.
pub fn normalize_token(token: &str) -> String {
    token
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-')
        .trim_matches(|c: char| c == '\'' || c == '-')
        .to_lowercase()
}

/// A token counts as an alphabetic word when most of its characters are letters.
pub fn is_alphabetic_word(token: &str) -> bool {
    let letters = token.chars().filter(|c| c.is_alphabetic()).count();
    let total = token.chars().filter(|c| !c.is_ascii_punctuation()).count();
    letters > 0 && letters * 2 >= total.max(1)
}

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(word)
}

/// Content words: alphabetic, longer than three characters, not a stopword.
pub fn content_words(text: &str) -> Vec<String> {
    tokens(text)
        .into_iter()
        .map(normalize_token)
        .filter(|w| w.chars().count() > 3 && w.chars().all(|c| c.is_alphabetic() || c == '\'' || c == '-'))
        .filter(|w| !is_stopword(w))
        .collect()
}

/// Content words ordered by descending frequency, ties broken by first occurrence.
pub fn ranked_content_words(text: &str) -> Vec<String> {
    rank_by_frequency(content_words(text))
}

/// Adjacent content-word pairs ranked by frequency, a cheap stand-in for noun phrases.
pub fn ranked_phrases(text: &str) -> Vec<String> {
    let mut phrases = Vec::new();
    for sentence in sentences(text) {
        let words: Vec<String> = tokens(&sentence).into_iter().map(normalize_token).collect();
        for pair in words.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.chars().count() > 3
                && b.chars().count() > 3
                && !is_stopword(a)
                && !is_stopword(b)
                && a.chars().all(char::is_alphabetic)
                && b.chars().all(char::is_alphabetic)
            {
                phrases.push(format!("{} {}", a, b));
            }
        }
    }
    rank_by_frequency(phrases)
}

fn rank_by_frequency(items: Vec<String>) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (index, item) in items.into_iter().enumerate() {
        let entry = counts.entry(item).or_insert((0, index));
        entry.0 += 1;
    }
    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked.into_iter().map(|(item, _)| item).collect()
}

/// Sentences in order of appearance, trimmed, empties removed.
pub fn sentences(text: &str) -> Vec<String> {
    SENTENCE_SPLIT
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Distinct normalized tokens over total tokens.
pub fn lexical_diversity(text: &str) -> f64 {
    let words: Vec<String> = tokens(text)
        .into_iter()
        .map(normalize_token)
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return 0.0;
    }
    let distinct: HashSet<&String> = words.iter().collect();
    distinct.len() as f64 / words.len() as f64
}

/// Mean and variance of sentence lengths measured in words.
pub fn sentence_length_stats(text: &str) -> (f64, f64) {
    let lengths: Vec<f64> = sentences(text)
        .iter()
        .map(|s| word_count(s) as f64)
        .collect();
    if lengths.is_empty() {
        return (0.0, 0.0);
    }
    let mean = lengths.iter().sum::<f64>() / lengths.len() as f64;
    let variance = lengths.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / lengths.len() as f64;
    (mean, variance)
}

/// Case-insensitive whole-word containment.
pub fn contains_word(haystack: &str, word: &str) -> bool {
    let needle = word.trim().to_lowercase();
    if needle.is_empty() {
        return false;
    }
    if needle.contains(' ') {
        return haystack.to_lowercase().contains(&needle);
    }
    tokens(haystack)
        .into_iter()
        .map(normalize_token)
        .any(|t| t == needle || (t.starts_with(&needle) && t.len() <= needle.len() + 4))
}
