//! Extraction of structured verdicts from free-form evaluator text.
//!
//! Evaluators answer in natural language. This parser applies a fixed
//! pattern-matching contract: a `VERDICT:` or `CLASSIFICATION:` label
//! followed by one of the four verdict literals, and a `CONFIDENCE:` or
//! `SCORE:` label followed by a decimal number. Extraction is deliberately
//! lossy and best-effort over unstructured text: correctness here means
//! "never fails", not "always exact". Missing or unrecognized labels fall
//! back to conservative defaults.

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::Verdict;

/// Verdict assumed when no verdict label can be extracted.
pub const DEFAULT_VERDICT: Verdict = Verdict::Unverifiable;

/// Confidence assumed when no confidence label can be extracted.
pub const DEFAULT_CONFIDENCE: f64 = 50.0;

lazy_static! {
    static ref VERDICT_PATTERN: Regex = Regex::new(
        r"(?i)(?:VERDICT|CLASSIFICATION):\s*(TRUE|FALSE|MIXED|UNVERIFIABLE)"
    )
    .unwrap();

    static ref CONFIDENCE_PATTERN: Regex = Regex::new(
        r"(?i)(?:CONFIDENCE|SCORE):\s*(\d+(?:\.\d+)?)"
    )
    .unwrap();
}

/// Extract `(verdict, confidence)` from an evaluator's raw answer.
///
/// Confidence is clamped to [0, 100]; the label patterns already bound the
/// verdict to the four fixed literals.
pub fn parse_verdict(raw: &str) -> (Verdict, f64) {
    let verdict = VERDICT_PATTERN
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<Verdict>().ok())
        .unwrap_or(DEFAULT_VERDICT);

    let confidence = CONFIDENCE_PATTERN
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|value| value.clamp(0.0, 100.0))
        .unwrap_or(DEFAULT_CONFIDENCE);

    (verdict, confidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_verdict_and_confidence() {
        let raw = "After review of the cited studies:\nVERDICT: FALSE\nCONFIDENCE: 92\nThe claim misstates the findings.";
        assert_eq!(parse_verdict(raw), (Verdict::False, 92.0));
    }

    #[test]
    fn test_classification_and_score_labels() {
        let raw = "Classification: mixed\nScore: 67.5";
        assert_eq!(parse_verdict(raw), (Verdict::Mixed, 67.5));
    }

    #[test]
    fn test_labels_are_case_insensitive() {
        let raw = "verdict: true\nconfidence: 80";
        assert_eq!(parse_verdict(raw), (Verdict::True, 80.0));
    }

    #[test]
    fn test_missing_verdict_defaults_to_unverifiable() {
        let raw = "I could not determine the truth of this claim. CONFIDENCE: 30";
        assert_eq!(parse_verdict(raw), (Verdict::Unverifiable, 30.0));
    }

    #[test]
    fn test_missing_confidence_defaults_to_fifty() {
        let raw = "VERDICT: TRUE — this is well documented.";
        assert_eq!(parse_verdict(raw), (Verdict::True, DEFAULT_CONFIDENCE));
    }

    #[test]
    fn test_unrecognized_label_defaults() {
        let raw = "VERDICT: PROBABLY\nwho knows";
        assert_eq!(
            parse_verdict(raw),
            (DEFAULT_VERDICT, DEFAULT_CONFIDENCE)
        );
    }

    #[test]
    fn test_empty_input_never_fails() {
        assert_eq!(parse_verdict(""), (DEFAULT_VERDICT, DEFAULT_CONFIDENCE));
    }

    #[test]
    fn test_confidence_clamped_to_hundred() {
        let raw = "VERDICT: TRUE\nCONFIDENCE: 250";
        assert_eq!(parse_verdict(raw), (Verdict::True, 100.0));
    }

    #[test]
    fn test_first_match_wins_on_repeated_labels() {
        let raw = "VERDICT: TRUE\n...\nVERDICT: FALSE\nCONFIDENCE: 60";
        assert_eq!(parse_verdict(raw), (Verdict::True, 60.0));
    }
}
