//! Deterministic content classification and risk assessment.
//!
//! **Question**: what is this content about, and how much damage can it do
//! if it is wrong?
//!
//! Classification is keyword pattern matching over the submitted text.
//! It is intentionally cheap and deterministic: the expensive judgment
//! calls are made by the evaluators, not here. The risk level only decides
//! which workflow branch runs, so a misclassification costs one redundant
//! (or one missing) evaluator call, never a wrong verdict.

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::{ContentCategory, Priority, RiskLevel};

lazy_static! {
    static ref HEALTH_PATTERN: Regex = Regex::new(
        r"(?i)\b(vaccin\w*|cure[sd]?|disease[s]?|cancer|virus|covid|treatment[s]?|medic\w*|doctor[s]?|symptom[s]?|drug[s]?|therapy|pandemic|health)\b"
    )
    .unwrap();

    static ref POLITICS_PATTERN: Regex = Regex::new(
        r"(?i)\b(election[s]?|vote[rs]?|voting|ballot[s]?|president\w*|senat\w*|congress\w*|government[s]?|minister[s]?|policy|parliament\w*|campaign[s]?|legislat\w*)\b"
    )
    .unwrap();

    // Markers typical of engineered-to-spread content.
    static ref VIRAL_PATTERN: Regex = Regex::new(
        r"(?i)(breaking[:!]|share (this|before)|they don't want you to know|doctors hate|miracle cure|wake up|before (it's|they) delete[d]?|100% (proof|proven)|urgent[:!])"
    )
    .unwrap();
}

/// Assign a topical category to content.
///
/// Health wins over politics when both match; health misinformation is
/// the higher-harm class and gets the stricter source list downstream.
pub fn classify(content: &str) -> ContentCategory {
    if HEALTH_PATTERN.is_match(content) {
        ContentCategory::Health
    } else if POLITICS_PATTERN.is_match(content) {
        ContentCategory::Politics
    } else {
        ContentCategory::General
    }
}

/// Assess misinformation risk from category, viral markers, and priority.
///
/// Health and politics content starts at `Medium`; viral-bait phrasing
/// escalates one level, and a high-priority request escalates one level.
pub fn assess_risk(content: &str, category: ContentCategory, priority: Priority) -> RiskLevel {
    let mut risk = match category {
        ContentCategory::Health | ContentCategory::Politics => RiskLevel::Medium,
        ContentCategory::General => RiskLevel::Low,
    };

    if VIRAL_PATTERN.is_match(content) {
        risk = risk.escalate();
    }

    if priority == Priority::High {
        risk = risk.escalate();
    }

    risk
}
