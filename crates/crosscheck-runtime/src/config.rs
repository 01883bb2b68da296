//! Runtime configuration.
//!
//! Deserializable from the YAML file the CLI loads, with defaults that
//! match a single-node deployment. Durations are expressed in seconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::cache::DEFAULT_TTL;
use crate::quota::Plan;

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Workflow engine timing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Timeout for one evaluator call
    #[serde(with = "duration_secs")]
    pub adapter_timeout: Duration,

    /// Overall deadline for one analysis request
    #[serde(with = "duration_secs")]
    pub overall_deadline: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            adapter_timeout: Duration::from_secs(15),
            overall_deadline: Duration::from_secs(30),
        }
    }
}

/// Result cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum cached results
    pub max_entries: u64,

    /// Time-to-live for cached results
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: DEFAULT_TTL,
        }
    }
}

/// One configured evaluator adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorSpec {
    /// Registered evaluator type (e.g. "openai", "gemini", "perplexity")
    #[serde(rename = "type")]
    pub evaluator_type: String,

    /// Adapter-specific configuration
    #[serde(default)]
    pub config: JsonValue,
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub engine: EngineConfig,
    pub cache: CacheConfig,

    /// Plan assigned to callers the ledger has not seen before
    pub default_plan: Plan,

    /// Evaluators to instantiate at startup
    pub evaluators: Vec<EvaluatorSpec>,
}
