//! # crosscheck-core
//!
//! Deterministic core of the CrossCheck content-verification pipeline.
//!
//! This crate holds everything that must be pure and reproducible:
//! verdict and risk domain types, content fingerprinting, the free-form
//! response parser, keyword classification, and the weighted consensus
//! calculator.
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same input always produces same output
//! 2. **No I/O**: All evaluator calls live in `crosscheck-runtime`
//! 3. **Order-insensitive**: Consensus is a weighted reduction with a
//!    fixed, documented tie-break
//!
//! ## Example
//!
//! ```rust
//! use crosscheck_core::{aggregate, parse_verdict, ProviderVerdict, Verdict};
//!
//! let (verdict, confidence) = parse_verdict("VERDICT: TRUE\nCONFIDENCE: 90");
//! let one = ProviderVerdict {
//!     provider: "gpt-4".to_string(),
//!     verdict,
//!     confidence,
//!     raw_text: String::new(),
//!     sources: Default::default(),
//! };
//!
//! let consensus = aggregate(&[one]).unwrap();
//! assert_eq!(consensus.verdict, Verdict::True);
//! ```

pub mod classify;
pub mod consensus;
pub mod fingerprint;
pub mod parser;
pub mod types;

// Re-export main types at crate root
pub use classify::{assess_risk, classify};
pub use consensus::{aggregate, ConsensusError};
pub use fingerprint::Fingerprint;
pub use parser::{parse_verdict, DEFAULT_CONFIDENCE, DEFAULT_VERDICT};
pub use types::{
    AnalysisRequest, ConsensusResult, ContentCategory, ContentType, Priority, ProviderVerdict,
    RequestError, RiskLevel, UnknownLabel, Verdict, MAX_CONTENT_CHARS,
};
