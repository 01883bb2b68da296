//! Prompts sent to verdict evaluators.
//!
//! Every adapter uses the same prompt contract so the response parser in
//! `crosscheck-core` can extract verdicts uniformly. The contract is the
//! labelled-line format the parser matches: a `VERDICT:` line with one of
//! the four fixed literals and a `CONFIDENCE:` line with a number.

/// System prompt establishing the evaluator as a fact-checker.
///
/// The output-format instructions mirror the response parser's contract.
/// An evaluator that ignores them degrades to the parser's conservative
/// defaults (UNVERIFIABLE / 50) rather than failing the request.
pub const FACT_CHECK_SYSTEM_PROMPT: &str = "\
You are an expert fact-checker. Analyze content for misinformation.

Respond with:
VERDICT: TRUE, FALSE, MIXED, or UNVERIFIABLE
CONFIDENCE: a score from 0 to 100
followed by your reasoning and any sources you relied on.";

/// Build the user prompt for a fact-check request.
pub fn fact_check_prompt(content: &str, sources: &[String]) -> String {
    if sources.is_empty() {
        format!("Analyze this content: \"{content}\"")
    } else {
        format!(
            "Analyze this content: \"{content}\"\n\nAvailable sources: {}",
            sources.join(", ")
        )
    }
}
