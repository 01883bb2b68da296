//! Evaluator adapters for crosscheck-runtime.
//!
//! This module defines the trait for external verdict providers and
//! includes adapters for OpenAI-compatible, Gemini, and Perplexity APIs.
//!
//! ## Security
//!
//! All adapters use the [`secrets`] module for secure credential handling.
//! See [`ApiCredential`] for the recommended patterns.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crosscheck_core::ProviderVerdict;

mod factory;
pub mod secrets;

#[cfg(feature = "gemini")]
mod gemini;
#[cfg(feature = "openai")]
mod openai;
#[cfg(feature = "perplexity")]
mod perplexity;

pub use factory::{EvaluatorFactory, EvaluatorRegistry};
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "gemini")]
pub use gemini::{GeminiEvaluator, GeminiEvaluatorFactory};
#[cfg(feature = "openai")]
pub use openai::{OpenAiEvaluator, OpenAiEvaluatorFactory};
#[cfg(feature = "perplexity")]
pub use perplexity::{PerplexityEvaluator, PerplexityEvaluatorFactory};

/// Errors from evaluator adapters.
///
/// Every variant is local to one adapter invocation. The workflow engine
/// excludes the failed adapter's result and carries on; a single adapter
/// error never fails a request on its own.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Evaluator not configured: {0}")]
    NotConfigured(String),
}

/// Configuration for one evaluator call.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Model to request from the provider
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature (low for reproducible verdicts)
    pub temperature: f32,

    /// Request timeout
    pub timeout: Duration,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            max_tokens: 1000,
            temperature: 0.1,
            timeout: Duration::from_secs(15),
        }
    }
}

/// Uniform capability over one external verdict provider.
///
/// # Contract
/// - Exactly one network call per `evaluate` invocation, with a bounded
///   timeout. No internal retries; retry policy belongs to the caller.
/// - Failures are local: an adapter must never block or fail its siblings.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Submit content (plus candidate sources) and produce a structured
    /// verdict, or fail with a [`ProviderError`].
    async fn evaluate(
        &self,
        content: &str,
        sources: &[String],
    ) -> Result<ProviderVerdict, ProviderError>;

    /// Check if the evaluator is usable (credentials present).
    async fn health_check(&self) -> bool;

    /// Provider name for logs and verdict attribution.
    fn name(&self) -> &str;
}
