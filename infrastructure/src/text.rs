//! Lexical helpers shared by the JSONL store and the rule-based oracle.

use std::collections::BTreeSet;

const STOPWORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "by", "can", "did", "do", "does", "for",
    "from", "how", "i", "in", "is", "it", "its", "of", "on", "or", "our", "should", "that", "the",
    "this", "to", "was", "we", "were", "what", "when", "where", "which", "who", "why", "with",
    "work", "works", "you",
];

/// Lowercased alphanumeric terms of `text`, minus stopwords and single letters.
pub(crate) fn terms(text: &str) -> BTreeSet<String> {
    term_list(text).into_iter().collect()
}

/// Same terms as [`terms`], in order of first appearance.
pub(crate) fn term_list(text: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() > 1)
        .map(str::to_lowercase)
        .filter(|word| !STOPWORDS.contains(&word.as_str()))
        .filter(|word| seen.insert(word.clone()))
        .collect()
}

/// Share of `query` terms that also appear in `document`, in [0, 1].
pub(crate) fn overlap(query: &BTreeSet<String>, document: &BTreeSet<String>) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let shared = query.intersection(document).count();
    shared as f64 / query.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terms_drop_stopwords_and_punctuation() {
        let t = terms("How does JWT authentication work? (see src/auth.rs)");
        let expected: BTreeSet<String> = ["jwt", "authentication", "see", "src", "auth", "rs"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(t, expected);
    }

    #[test]
    fn test_term_list_keeps_first_appearance() {
        assert_eq!(
            term_list("Why did login fail? Login retries fail too"),
            vec!["login", "fail", "retries", "too"]
        );
    }

    #[test]
    fn test_overlap_fraction() {
        let q = terms("login failure token");
        let d = terms("Token refresh caused the login outage");
        assert!((overlap(&q, &d) - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(overlap(&BTreeSet::new(), &d), 0.0);
    }
}
