//! # crosscheck-runtime
//!
//! Async orchestration runtime for the CrossCheck content-verification
//! pipeline.
//!
//! This crate owns everything with a side effect: evaluator adapters and
//! their HTTP calls, the content-addressed result cache, the per-caller
//! quota ledger, and the workflow engine that wires them together.
//!
//! ## Architecture
//!
//! - Parallel fan-out: high-risk content runs every configured evaluator
//!   concurrently, each under its own bounded timeout
//! - Deterministic fan-in: verdicts aggregate through the pure consensus
//!   calculator in `crosscheck-core`
//! - Fail-soft edges: a single evaluator failure is excluded, a cache
//!   outage degrades to a miss; only all-evaluators-failed, a zero-verdict
//!   deadline, or an exhausted quota fail a request
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use crosscheck_core::AnalysisRequest;
//! use crosscheck_runtime::{OpenAiEvaluator, WorkflowEngine};
//!
//! let engine = WorkflowEngine::builder()
//!     .evaluator(Arc::new(OpenAiEvaluator::new(api_key)))
//!     .build()?;
//!
//! let request = AnalysisRequest::text("The moon landing was filmed in a studio.")?;
//! let report = engine.analyze("caller-42", &request).await?;
//! println!("{} ({}% confident)", report.verdict, report.confidence);
//! ```

pub mod cache;
pub mod config;
pub mod prompts;
pub mod providers;
pub mod quota;
pub mod sources;
pub mod workflow;

// Re-export main types at crate root
pub use cache::{CacheError, MokaResultCache, ResultCache, DEFAULT_TTL};
pub use config::{CacheConfig, EngineConfig, EvaluatorSpec, RuntimeConfig};
pub use providers::{
    ApiCredential, CredentialSource, Evaluator, EvaluatorConfig, EvaluatorFactory,
    EvaluatorRegistry, ProviderError,
};
pub use quota::{Plan, PlanLimits, QuotaError, QuotaLedger, QuotaScope, UsageSummary};
pub use sources::{attribute_sources, trusted_sources};
pub use workflow::{
    AnalysisError, AnalysisReport, AuditRecord, BuildError, Stage, WorkflowEngine,
    WorkflowEngineBuilder,
};

#[cfg(feature = "gemini")]
pub use providers::{GeminiEvaluator, GeminiEvaluatorFactory};
#[cfg(feature = "openai")]
pub use providers::{OpenAiEvaluator, OpenAiEvaluatorFactory};
#[cfg(feature = "perplexity")]
pub use providers::{PerplexityEvaluator, PerplexityEvaluatorFactory};
