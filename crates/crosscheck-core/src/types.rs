//! Domain types shared across the CrossCheck pipeline.
//!
//! Everything here is a closed enum or an immutable value type. Risk levels,
//! verdicts, and content categories are tagged variants rather than free-form
//! strings so that branch tables stay exhaustive and compiler-checked.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum accepted content length, in characters.
pub const MAX_CONTENT_CHARS: usize = 50_000;

/// A truthfulness verdict for a piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    True,
    False,
    Mixed,
    Unverifiable,
}

impl Verdict {
    /// All verdicts in tie-break priority order.
    ///
    /// When two verdict labels accumulate exactly equal consensus weight,
    /// the earlier entry in this list wins. The order is fixed:
    /// TRUE > MIXED > FALSE > UNVERIFIABLE.
    pub const TIE_BREAK_ORDER: [Verdict; 4] = [
        Verdict::True,
        Verdict::Mixed,
        Verdict::False,
        Verdict::Unverifiable,
    ];

    /// Upper-case label as it appears in evaluator output.
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::True => "TRUE",
            Verdict::False => "FALSE",
            Verdict::Mixed => "MIXED",
            Verdict::Unverifiable => "UNVERIFIABLE",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Verdict {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TRUE" => Ok(Verdict::True),
            "FALSE" => Ok(Verdict::False),
            "MIXED" => Ok(Verdict::Mixed),
            "UNVERIFIABLE" => Ok(Verdict::Unverifiable),
            other => Err(UnknownLabel(other.to_string())),
        }
    }
}

/// A label that is not one of the fixed verdict literals.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown verdict label: {0}")]
pub struct UnknownLabel(pub String);

/// The submitted content's media kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Image,
    Url,
}

/// Caller-supplied processing priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Normal,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

/// Topical category assigned during classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentCategory {
    Health,
    Politics,
    General,
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentCategory::Health => f.write_str("health"),
            ContentCategory::Politics => f.write_str("politics"),
            ContentCategory::General => f.write_str("general"),
        }
    }
}

/// Misinformation risk assessed for a request.
///
/// Drives the workflow branch: `High` routes through the full multi-evaluator
/// fan-out, `Low` and `Medium` take the single-evaluator direct path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Bump the level by one step, saturating at `High`.
    pub fn escalate(self) -> Self {
        match self {
            RiskLevel::Low => RiskLevel::Medium,
            RiskLevel::Medium | RiskLevel::High => RiskLevel::High,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => f.write_str("low"),
            RiskLevel::Medium => f.write_str("medium"),
            RiskLevel::High => f.write_str("high"),
        }
    }
}

/// Errors constructing an [`AnalysisRequest`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("content is empty")]
    EmptyContent,

    #[error("content too large: {length} chars exceeds maximum {max}")]
    ContentTooLarge { length: usize, max: usize },
}

/// A validated, immutable analysis submission.
///
/// Identified by the deterministic fingerprint of its exact content bytes;
/// see [`crate::fingerprint`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    content: String,
    content_type: ContentType,
    priority: Priority,
}

impl AnalysisRequest {
    /// Validate and create a request.
    pub fn new(
        content: impl Into<String>,
        content_type: ContentType,
        priority: Priority,
    ) -> Result<Self, RequestError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(RequestError::EmptyContent);
        }
        let length = content.chars().count();
        if length > MAX_CONTENT_CHARS {
            return Err(RequestError::ContentTooLarge {
                length,
                max: MAX_CONTENT_CHARS,
            });
        }
        Ok(Self {
            content,
            content_type,
            priority,
        })
    }

    /// Plain-text request with normal priority.
    pub fn text(content: impl Into<String>) -> Result<Self, RequestError> {
        Self::new(content, ContentType::Text, Priority::Normal)
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }
}

/// A structured verdict produced by exactly one evaluator invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderVerdict {
    /// Which evaluator produced this verdict (e.g. "gpt-4", "gemini").
    pub provider: String,

    /// The extracted verdict label.
    pub verdict: Verdict,

    /// Confidence in [0, 100].
    pub confidence: f64,

    /// The evaluator's full free-form answer, kept for auditing.
    pub raw_text: String,

    /// Sources the evaluator cited, if any.
    pub sources: BTreeSet<String>,
}

impl ProviderVerdict {
    /// Consensus weight of this verdict: confidence scaled to [0, 1].
    pub fn weight(&self) -> f64 {
        self.confidence / 100.0
    }
}

/// The aggregated outcome of one or more provider verdicts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    /// Winning verdict label.
    pub verdict: Verdict,

    /// Weighted mean confidence, rounded to the nearest integer, in [0, 100].
    pub confidence: f64,

    /// Fraction of total evaluator weight behind the winning verdict, in [0, 1].
    pub agreement: f64,

    /// Number of verdicts that contributed.
    pub model_count: usize,

    /// Union of sources cited by contributing verdicts.
    pub sources: BTreeSet<String>,
}
