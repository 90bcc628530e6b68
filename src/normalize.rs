//! Text normalization for display and for classifier training.
//!
//! Two flavors, both pure and idempotent:
//!
//! - [`clean_text`]: display normalization — decode HTML entities, fold
//!   newlines into spaces, collapse whitespace runs, trim. Applied to scraped
//!   article bodies and feed titles before storage.
//! - [`clean_for_training`]: everything above plus lowercasing and removal of
//!   all non-word, non-space characters. Applied to sample text right before
//!   vectorization, on both the training and the prediction path.

use once_cell::sync::Lazy;
use quick_xml::escape::unescape;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

/// Display normalization: entity-decode, single-space, trim.
///
/// Strings with a bare `&` or otherwise malformed entities are kept verbatim
/// through the decode step, which also makes the function idempotent on its
/// own output.
pub fn clean_text(raw: &str) -> String {
    let decoded = match unescape(raw) {
        Ok(cow) => cow.into_owned(),
        Err(_) => raw.to_string(),
    };
    let folded = decoded.replace(['\n', '\r'], " ");
    WHITESPACE.replace_all(&folded, " ").trim().to_string()
}

/// Training normalization: [`clean_text`], then lowercase and strip
/// punctuation (every character outside `\w` and `\s`).
pub fn clean_for_training(raw: &str) -> String {
    let cleaned = clean_text(raw);
    let stripped = NON_WORD.replace_all(&cleaned, "");
    WHITESPACE
        .replace_all(&stripped, " ")
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_decodes_entities() {
        assert_eq!(
            clean_text("Fish &amp; Chips &quot;to go&quot;"),
            "Fish & Chips \"to go\""
        );
    }

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(
            clean_text("  one\n\ntwo\t three \r\n four  "),
            "one two three four"
        );
    }

    #[test]
    fn test_clean_text_keeps_malformed_entities() {
        assert_eq!(clean_text("AT&T rocks"), "AT&T rocks");
    }

    #[test]
    fn test_clean_text_idempotent() {
        let once = clean_text("  Markets &amp; Trade\nreport ");
        assert_eq!(clean_text(&once), once);
    }

    #[test]
    fn test_clean_for_training_strips_punctuation_and_lowercases() {
        assert_eq!(
            clean_for_training("The Minister's \"Plan B\", explained!"),
            "the ministers plan b explained"
        );
    }

    #[test]
    fn test_clean_for_training_idempotent() {
        let once = clean_for_training("Prices up 4.2% — again?");
        assert_eq!(clean_for_training(&once), once);
    }

    #[test]
    fn test_clean_for_training_empty() {
        assert_eq!(clean_for_training("  ...  "), "");
    }
}
