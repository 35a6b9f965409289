//! Sentence-level cleanup of generated text.

use std::collections::HashSet;

const SENTENCE_SEPARATOR: &str = ". ";

/// Drops repeated `". "`-separated fragments, keeping first occurrences in order.
///
/// Fragments compare as exact strings. Idempotent: a second pass finds no
/// duplicates.
pub fn clean(text: &str) -> String {
    let mut seen = HashSet::new();
    text.split(SENTENCE_SEPARATOR)
        .filter(|fragment| seen.insert(*fragment))
        .collect::<Vec<_>>()
        .join(SENTENCE_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn collapses_repeated_sentences() {
        assert_eq!(clean("cats are great. cats are great"), "cats are great");
        assert_eq!(clean("A. B. A. C. B. D"), "A. B. C. D");
    }

    #[test]
    fn compares_fragments_exactly() {
        assert_eq!(clean("Cats. cats. Cats"), "Cats. cats");
        assert_eq!(clean("a.  a. a"), "a.  a");
    }

    #[test]
    fn handles_empty_and_separator_only_input() {
        assert_eq!(clean(""), "");
        assert_eq!(clean(". "), "");
        assert_eq!(clean("x. . . y"), "x. . y");
    }

    fn fragments() -> impl Strategy<Value = String> {
        proptest::collection::vec(prop_oneof!["[a-c]{0,3}", Just(String::new())], 0..12)
            .prop_map(|parts| parts.join(SENTENCE_SEPARATOR))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn clean_is_idempotent(text in any::<String>()) {
            let once = clean(&text);
            prop_assert_eq!(clean(&once), once);
        }

        #[test]
        fn clean_is_idempotent_on_repetitive_text(text in fragments()) {
            let once = clean(&text);
            prop_assert_eq!(clean(&once), once);
        }

        #[test]
        fn first_occurrences_keep_relative_order(text in fragments()) {
            let mut expected: Vec<&str> = Vec::new();
            for fragment in text.split(SENTENCE_SEPARATOR) {
                if !expected.contains(&fragment) {
                    expected.push(fragment);
                }
            }

            let cleaned = clean(&text);
            let actual: Vec<&str> = cleaned.split(SENTENCE_SEPARATOR).collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
