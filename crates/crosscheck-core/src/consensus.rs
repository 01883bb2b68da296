//! Weighted consensus over heterogeneous evaluator verdicts.
//!
//! Aggregation is a pure, order-insensitive reduction: each verdict
//! contributes weight equal to `confidence / 100`, weights are summed per
//! verdict label, and the label with the greatest summed weight wins.
//!
//! Ties on summed weight are broken by the fixed priority order
//! TRUE > MIXED > FALSE > UNVERIFIABLE ([`Verdict::TIE_BREAK_ORDER`]),
//! so aggregating the same verdict set in any input order yields the same
//! winner.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::types::{ConsensusResult, ProviderVerdict, Verdict};

/// Errors from consensus calculation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    /// The calculator was invoked with an empty verdict set.
    ///
    /// The workflow engine must short-circuit with its own
    /// all-evaluators-failed error before reaching aggregation, so this
    /// is an internal invariant violation if it ever surfaces.
    #[error("no verdicts to aggregate")]
    NoVerdicts,
}

/// Aggregate a non-empty set of provider verdicts into one consensus.
///
/// The result's `confidence` is the weighted mean of all contributing
/// confidences (not just the winning label's), rounded to the nearest
/// integer. `agreement` is the winning label's share of total weight,
/// always in [0, 1].
pub fn aggregate(verdicts: &[ProviderVerdict]) -> Result<ConsensusResult, ConsensusError> {
    if verdicts.is_empty() {
        return Err(ConsensusError::NoVerdicts);
    }

    let mut label_weight = [0.0_f64; 4];
    let mut label_count = [0_usize; 4];
    let mut weighted_confidence = 0.0_f64;
    let mut total_weight = 0.0_f64;

    for verdict in verdicts {
        let weight = verdict.weight();
        let slot = tie_break_index(verdict.verdict);
        label_weight[slot] += weight;
        label_count[slot] += 1;
        weighted_confidence += verdict.confidence * weight;
        total_weight += weight;
    }

    // Scan in tie-break order with a strict comparison: on exactly equal
    // summed weight, the earlier (higher-priority) label keeps the win.
    let mut winner = 0;
    for slot in 1..4 {
        if label_weight[slot] > label_weight[winner] {
            winner = slot;
        }
    }

    let (confidence, agreement) = if total_weight > 0.0 {
        (
            (weighted_confidence / total_weight).round(),
            label_weight[winner] / total_weight,
        )
    } else {
        // Every contributor reported zero confidence. Weighted shares are
        // undefined, so agreement degrades to the winner's share by count.
        (0.0, label_count[winner] as f64 / verdicts.len() as f64)
    };

    let sources: BTreeSet<String> = verdicts
        .iter()
        .flat_map(|v| v.sources.iter().cloned())
        .collect();

    Ok(ConsensusResult {
        verdict: Verdict::TIE_BREAK_ORDER[winner],
        confidence,
        agreement,
        model_count: verdicts.len(),
        sources,
    })
}

fn tie_break_index(verdict: Verdict) -> usize {
    Verdict::TIE_BREAK_ORDER
        .iter()
        .position(|v| *v == verdict)
        .expect("every verdict appears in the tie-break order")
}
