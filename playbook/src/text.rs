//! Text normalization shared by the classifier, the guard and the engine.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercase, fold accents (NFD, combining marks dropped) and collapse
/// whitespace runs to a single space.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Alphanumeric tokens of already-normalized text.
///
/// Apostrophes and punctuation split words, so `l'anglais` yields `l` and
/// `anglais`.
pub fn tokens(normalized: &str) -> Vec<&str> {
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Normalized form used for duplicate detection: normalized text with
/// punctuation removed.
pub fn comparable(text: &str) -> String {
    tokens(&normalize(text)).join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_accents_and_whitespace() {
        assert_eq!(normalize("  Améliorer   mon\tFRANÇAIS "), "ameliorer mon francais");
        assert_eq!(normalize("Réussir ma vie"), "reussir ma vie");
    }

    #[test]
    fn test_normalize_keeps_arrow() {
        assert_eq!(normalize("Guitar → World"), "guitar → world");
    }

    #[test]
    fn test_tokens_split_on_punctuation() {
        let text = normalize("J'apprends l'anglais, vite!");
        assert_eq!(tokens(&text), vec!["j", "apprends", "l", "anglais", "vite"]);
    }

    #[test]
    fn test_comparable_ignores_punctuation_and_case() {
        assert_eq!(comparable("Listen, then repeat."), comparable("listen then REPEAT"));
    }
}
