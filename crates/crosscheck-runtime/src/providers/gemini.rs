//! Google Gemini generateContent adapter.
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

/// Environment variable name for the Gemini API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-pro";

/// Gemini evaluator adapter.
pub struct GeminiEvaluator {
    credential: ApiCredential,
    base_url: String,
    config: EvaluatorConfig,
}

impl std::fmt::Debug for GeminiEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiEvaluator")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}

impl GeminiEvaluator {
    /// Create an adapter with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            credential: ApiCredential::new(
                api_key,
                super::secrets::CredentialSource::Programmatic,
                "Gemini API key",
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
            GEMINI_API_KEY_ENV,
            "Gemini API key",
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

/// Gemini API request format.
#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TextPart {
    text: String,
}

/// Gemini API response format.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[async_trait]
impl Evaluator for GeminiEvaluator {
    async fn evaluate(
        &self,
        content: &str,
        sources: &[String],
    ) -> Result<ProviderVerdict, ProviderError> {
        // Gemini has no separate system role in this dialect; prepend the
        // instructions to the single user part.
        let prompt = format!(
            "{FACT_CHECK_SYSTEM_PROMPT}\n\n{}",
            fact_check_prompt(content, sources)
        );

        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![TextPart { text: prompt }],
            }],
        };

        // SECURITY: credential exposed only here, at the point of use
        let response = self
            .client()
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.config.model
            ))
            .header("x-goog-api-key", self.credential.expose())
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

        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ProviderError::AuthError);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited { retry_after: None });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        let raw_text = body
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                ProviderError::MalformedResponse("response contained no candidates".to_string())
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

/// Factory for creating Gemini adapters from configuration.
///
/// ## Configuration Format
/// ```json
/// {
///   "api_key": "...",           // Optional, falls back to GEMINI_API_KEY env
///   "base_url": "https://...",  // Optional, custom API endpoint
///   "model": "gemini-pro",      // Optional, default model
///   "timeout_secs": 15          // Optional
/// }
/// ```
pub struct GeminiEvaluatorFactory;

impl EvaluatorFactory for GeminiEvaluatorFactory {
    fn evaluator_type(&self) -> &'static str {
        "gemini"
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn Evaluator>, ProviderError> {
        Ok(Arc::new(GeminiEvaluator::from_config(config)?))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        if !ApiCredential::is_available(config, "api_key", GEMINI_API_KEY_ENV) {
            return Err(ProviderError::NotConfigured(format!(
                "Gemini API key required: set 'api_key' in config or {GEMINI_API_KEY_ENV} env"
            )));
        }
        Ok(())
    }

    fn default_config(&self) -> JsonValue {
        serde_json::json!({ "model": DEFAULT_MODEL })
    }

    fn description(&self) -> &'static str {
        "Google Gemini generateContent evaluator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluator_creation() {
        let evaluator = GeminiEvaluator::new("test-key");
        assert_eq!(evaluator.name(), "gemini-pro");
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let secret = "gm-super-secret-key";
        let evaluator = GeminiEvaluator::new(secret);

        let debug = format!("{:?}", evaluator);
        assert!(!debug.contains(secret), "API key exposed in Debug output!");
    }

    #[test]
    fn test_factory_validate_requires_key() {
        let factory = GeminiEvaluatorFactory;
        assert!(factory
            .validate_config(&serde_json::json!({ "api_key": "k" }))
            .is_ok());
    }
}
