//! Perplexity online-model adapter.
//!
//! Perplexity's chat-completions dialect returns web citations alongside
//! the answer; those flow into the verdict's source set.
//!
//! ## Security
//!
//! The API key is handled via the centralized [`ApiCredential`] system.
//! See the [`secrets`](super::secrets) module for details.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

use crosscheck_core::{parse_verdict, ProviderVerdict};

use super::{
    factory::EvaluatorFactory,
    secrets::ApiCredential,
    Evaluator, EvaluatorConfig, ProviderError,
};
use crate::prompts::{fact_check_prompt, FACT_CHECK_SYSTEM_PROMPT};

/// Environment variable name for the Perplexity API key.
pub const PERPLEXITY_API_KEY_ENV: &str = "PERPLEXITY_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";
const DEFAULT_MODEL: &str = "sonar";

/// Perplexity evaluator adapter.
pub struct PerplexityEvaluator {
    credential: ApiCredential,
    base_url: String,
    config: EvaluatorConfig,
}

impl std::fmt::Debug for PerplexityEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerplexityEvaluator")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}

impl PerplexityEvaluator {
    /// Create an adapter with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            credential: ApiCredential::new(
                api_key,
                super::secrets::CredentialSource::Programmatic,
                "Perplexity API key",
            ),
            base_url: DEFAULT_BASE_URL.to_string(),
            config: EvaluatorConfig {
                model: DEFAULT_MODEL.to_string(),
                ..EvaluatorConfig::default()
            },
        }
    }

    /// Create from JSON configuration with environment fallback.
    pub fn from_config(config: &JsonValue) -> Result<Self, ProviderError> {
        let credential = ApiCredential::from_config_or_env(
            config,
            "api_key",
            PERPLEXITY_API_KEY_ENV,
            "Perplexity API key",
        )?;

        let base_url = config["base_url"]
            .as_str()
            .unwrap_or(DEFAULT_BASE_URL)
            .to_string();

        let mut evaluator_config = EvaluatorConfig {
            model: DEFAULT_MODEL.to_string(),
            ..EvaluatorConfig::default()
        };
        if let Some(model) = config["model"].as_str() {
            evaluator_config.model = model.to_string();
        }
        if let Some(timeout) = config["timeout_secs"].as_u64() {
            evaluator_config.timeout = Duration::from_secs(timeout);
        }

        Ok(Self {
            credential,
            base_url,
            config: evaluator_config,
        })
    }

    fn client(&self) -> &reqwest::Client {
        static CLIENT: std::sync::OnceLock<reqwest::Client> = std::sync::OnceLock::new();
        CLIENT.get_or_init(|| {
            reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client")
        })
    }
}

/// Perplexity API request format.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatRequestMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequestMessage {
    role: &'static str,
    content: String,
}

/// Perplexity API response format.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl Evaluator for PerplexityEvaluator {
    async fn evaluate(
        &self,
        content: &str,
        sources: &[String],
    ) -> Result<ProviderVerdict, ProviderError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatRequestMessage {
                    role: "system",
                    content: FACT_CHECK_SYSTEM_PROMPT.to_string(),
                },
                ChatRequestMessage {
                    role: "user",
                    content: fact_check_prompt(content, sources),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        // SECURITY: credential exposed only here, at the point of use
        let response = self
            .client()
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.credential.expose())
            .timeout(self.config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.config.timeout)
                } else {
                    ProviderError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::AuthError);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        let citations = body.citations.into_iter().collect();

        let raw_text = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ProviderError::MalformedResponse("response contained no message content".to_string())
            })?;

        let (verdict, confidence) = parse_verdict(&raw_text);

        Ok(ProviderVerdict {
            provider: self.config.model.clone(),
            verdict,
            confidence,
            raw_text,
            sources: citations,
        })
    }

    async fn health_check(&self) -> bool {
        !self.credential.is_empty()
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

/// Factory for creating Perplexity adapters from configuration.
///
/// ## Configuration Format
/// ```json
/// {
///   "api_key": "pplx-...",      // Optional, falls back to PERPLEXITY_API_KEY env
///   "base_url": "https://...",  // Optional, custom API endpoint
///   "model": "sonar",           // Optional, default model
///   "timeout_secs": 15          // Optional
/// }
/// ```
pub struct PerplexityEvaluatorFactory;

impl EvaluatorFactory for PerplexityEvaluatorFactory {
    fn evaluator_type(&self) -> &'static str {
        "perplexity"
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn Evaluator>, ProviderError> {
        Ok(Arc::new(PerplexityEvaluator::from_config(config)?))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        if !ApiCredential::is_available(config, "api_key", PERPLEXITY_API_KEY_ENV) {
            return Err(ProviderError::NotConfigured(format!(
                "Perplexity API key required: set 'api_key' in config or {PERPLEXITY_API_KEY_ENV} env"
            )));
        }
        Ok(())
    }

    fn default_config(&self) -> JsonValue {
        serde_json::json!({ "model": DEFAULT_MODEL })
    }

    fn description(&self) -> &'static str {
        "Perplexity online-model evaluator with citation extraction"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluator_creation() {
        let evaluator = PerplexityEvaluator::new("test-key");
        assert_eq!(evaluator.name(), "sonar");
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let secret = "pplx-super-secret-key";
        let evaluator = PerplexityEvaluator::new(secret);

        let debug = format!("{:?}", evaluator);
        assert!(!debug.contains(secret), "API key exposed in Debug output!");
    }

    #[test]
    fn test_citations_deserialize_when_absent() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":"VERDICT: TRUE\nCONFIDENCE: 70"}}]}"#,
        )
        .unwrap();
        assert!(body.citations.is_empty());
    }
}
