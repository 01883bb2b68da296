//! OpenAI-compatible chat-completions adapter.
//!
//! Works against api.openai.com and any endpoint speaking the same
//! `/chat/completions` dialect.
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

/// Environment variable name for the OpenAI API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible evaluator adapter.
pub struct OpenAiEvaluator {
    credential: ApiCredential,
    base_url: String,
    config: EvaluatorConfig,
}

impl std::fmt::Debug for OpenAiEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEvaluator")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}

impl OpenAiEvaluator {
    /// Create an adapter with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            credential: ApiCredential::new(
                api_key,
                super::secrets::CredentialSource::Programmatic,
                "OpenAI API key",
            ),
            base_url: DEFAULT_BASE_URL.to_string(),
            config: EvaluatorConfig::default(),
        }
    }

    /// Create from JSON configuration with environment fallback.
    pub fn from_config(config: &JsonValue) -> Result<Self, ProviderError> {
        let credential = ApiCredential::from_config_or_env(
            config,
            "api_key",
            OPENAI_API_KEY_ENV,
            "OpenAI API key",
        )?;

        let base_url = config["base_url"]
            .as_str()
            .unwrap_or(DEFAULT_BASE_URL)
            .to_string();

        let mut evaluator_config = EvaluatorConfig::default();
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

/// OpenAI API request format.
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

/// OpenAI API response format.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl Evaluator for OpenAiEvaluator {
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
            let message = response
                .json::<ApiErrorBody>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|_| "unreadable error body".to_string());
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

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
            sources: Default::default(),
        })
    }

    async fn health_check(&self) -> bool {
        !self.credential.is_empty()
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

/// Factory for creating OpenAI adapters from configuration.
///
/// ## Configuration Format
/// ```json
/// {
///   "api_key": "sk-...",        // Optional, falls back to OPENAI_API_KEY env
///   "base_url": "https://...",  // Optional, custom API endpoint
///   "model": "gpt-4",           // Optional, default model
///   "timeout_secs": 15          // Optional
/// }
/// ```
pub struct OpenAiEvaluatorFactory;

impl EvaluatorFactory for OpenAiEvaluatorFactory {
    fn evaluator_type(&self) -> &'static str {
        "openai"
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn Evaluator>, ProviderError> {
        Ok(Arc::new(OpenAiEvaluator::from_config(config)?))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        if !ApiCredential::is_available(config, "api_key", OPENAI_API_KEY_ENV) {
            return Err(ProviderError::NotConfigured(format!(
                "OpenAI API key required: set 'api_key' in config or {OPENAI_API_KEY_ENV} env"
            )));
        }

        if let Some(url) = config["base_url"].as_str() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ProviderError::NotConfigured(
                    "base_url must start with http:// or https://".to_string(),
                ));
            }
        }

        Ok(())
    }

    fn default_config(&self) -> JsonValue {
        serde_json::json!({ "model": "gpt-4" })
    }

    fn description(&self) -> &'static str {
        "OpenAI-compatible chat-completions evaluator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluator_creation() {
        let evaluator = OpenAiEvaluator::new("test-key");
        assert_eq!(evaluator.name(), "gpt-4");
    }

    #[tokio::test]
    async fn test_health_check_requires_key() {
        assert!(OpenAiEvaluator::new("test-key").health_check().await);
        assert!(!OpenAiEvaluator::new("").health_check().await);
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let secret = "sk-super-secret-key-12345";
        let evaluator = OpenAiEvaluator::new(secret);

        let debug = format!("{:?}", evaluator);
        assert!(!debug.contains(secret), "API key exposed in Debug output!");
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_factory_create_with_api_key() {
        let factory = OpenAiEvaluatorFactory;
        let config = serde_json::json!({ "api_key": "test-api-key" });
        let evaluator = factory.create(&config).unwrap();
        assert_eq!(evaluator.name(), "gpt-4");
    }

    #[test]
    fn test_factory_respects_model_override() {
        let config = serde_json::json!({ "api_key": "k", "model": "gpt-4o" });
        let evaluator = OpenAiEvaluator::from_config(&config).unwrap();
        assert_eq!(evaluator.name(), "gpt-4o");
    }

    #[test]
    fn test_factory_validate_invalid_base_url() {
        let factory = OpenAiEvaluatorFactory;
        let config = serde_json::json!({ "api_key": "k", "base_url": "not-a-url" });
        assert!(factory.validate_config(&config).is_err());
    }
}
