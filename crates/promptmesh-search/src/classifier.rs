//! Heuristic query classifier.
//!
//! Decides whether a raw user query reads as natural language (worth
//! expanding before retrieval) or as a keyword query (search as-is).
//! Deterministic, no network calls.

/// Interrogative and request words that mark a query as natural language.
const QUESTION_WORDS: &[&str] = &[
    "what", "how", "why", "where", "when", "which", "who", "find", "looking", "need", "want",
    "help", "show", "give", "can", "could", "would", "should",
];

/// True if the query reads as natural language: more than 5 tokens, a
/// question mark, or any question word as a whole token.
pub fn is_natural_language(query: &str) -> bool {
    let lower = query.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();

    if words.len() > 5 {
        return true;
    }

    if words.iter().any(|w| QUESTION_WORDS.contains(w)) {
        return true;
    }

    query.contains('?')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_sentence_expands() {
        assert!(is_natural_language("What is the best prompt?"));
    }

    #[test]
    fn test_short_keyword_query_does_not_expand() {
        assert!(!is_natural_language("email template"));
    }

    #[test]
    fn test_deterministic() {
        let q = "What is the best prompt?";
        assert_eq!(is_natural_language(q), is_natural_language(q));
    }

    #[test]
    fn test_more_than_five_words_expands() {
        assert!(is_natural_language("one two three four five six"));
        assert!(!is_natural_language("one two three four five"));
    }

    #[test]
    fn test_question_mark_alone_expands() {
        assert!(is_natural_language("marketing copy?"));
    }

    #[test]
    fn test_question_word_any_position() {
        assert!(is_natural_language("templates i need"));
        assert!(is_natural_language("Help with writing"));
    }

    #[test]
    fn test_question_word_case_insensitive() {
        assert!(is_natural_language("HOW to write"));
        assert!(is_natural_language("Would this work"));
    }

    #[test]
    fn test_question_word_must_be_whole_token() {
        // "however" and "showcase" contain question words as substrings
        // but are not question words themselves.
        assert!(!is_natural_language("however showcase"));
    }

    #[test]
    fn test_empty_query_does_not_expand() {
        assert!(!is_natural_language(""));
    }
}
