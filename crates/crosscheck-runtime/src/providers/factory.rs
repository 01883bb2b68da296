//! Factory pattern for dynamic evaluator registration.
//!
//! Deployments differ in which verdict providers they can reach. Factories
//! let new adapters be registered from configuration without modifying
//! enums.
//!
//! ## Usage
//!
//! ```ignore
//! let mut registry = EvaluatorRegistry::new();
//! registry.register(Arc::new(OpenAiEvaluatorFactory));
//!
//! let evaluator = registry.create("openai", &config)?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::{Evaluator, ProviderError};

/// Factory for creating evaluator adapters from configuration.
///
/// Each factory is responsible for:
/// 1. Validating its configuration format
/// 2. Creating adapter instances
/// 3. Providing a unique type identifier
pub trait EvaluatorFactory: Send + Sync {
    /// Unique identifier for this evaluator type.
    ///
    /// Examples: "openai", "gemini", "perplexity"
    fn evaluator_type(&self) -> &'static str;

    /// Create an adapter instance from JSON configuration.
    fn create(&self, config: &JsonValue) -> Result<Arc<dyn Evaluator>, ProviderError>;

    /// Validate configuration without creating an adapter.
    ///
    /// Use this for fast config validation during startup.
    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError>;

    /// Default configuration for this evaluator type.
    fn default_config(&self) -> JsonValue {
        serde_json::json!({})
    }

    /// Human-readable description of this evaluator.
    fn description(&self) -> &'static str {
        "Verdict evaluator"
    }
}

/// Registry of available evaluator factories.
#[derive(Default)]
pub struct EvaluatorRegistry {
    factories: BTreeMap<String, Arc<dyn EvaluatorFactory>>,
}

impl EvaluatorRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an evaluator factory.
    ///
    /// A factory with the same type replaces the existing one.
    pub fn register(&mut self, factory: Arc<dyn EvaluatorFactory>) {
        self.factories
            .insert(factory.evaluator_type().to_string(), factory);
    }

    /// Create an adapter from type name and configuration.
    pub fn create(
        &self,
        evaluator_type: &str,
        config: &JsonValue,
    ) -> Result<Arc<dyn Evaluator>, ProviderError> {
        self.factories
            .get(evaluator_type)
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!(
                    "Unknown evaluator type: '{}'. Available: {:?}",
                    evaluator_type,
                    self.available_types()
                ))
            })?
            .create(config)
    }

    /// Validate configuration for an evaluator type.
    pub fn validate(
        &self,
        evaluator_type: &str,
        config: &JsonValue,
    ) -> Result<(), ProviderError> {
        self.factories
            .get(evaluator_type)
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!("Unknown evaluator type: '{evaluator_type}'"))
            })?
            .validate_config(config)
    }

    /// List available evaluator types.
    pub fn available_types(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    /// Check if an evaluator type is registered.
    pub fn has_evaluator(&self, evaluator_type: &str) -> bool {
        self.factories.contains_key(evaluator_type)
    }

    /// Get the factory for an evaluator type.
    pub fn get_factory(&self, evaluator_type: &str) -> Option<&Arc<dyn EvaluatorFactory>> {
        self.factories.get(evaluator_type)
    }

    /// Create a registry with all compiled-in adapters registered.
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "openai")]
        registry.register(Arc::new(super::OpenAiEvaluatorFactory));
        #[cfg(feature = "gemini")]
        registry.register(Arc::new(super::GeminiEvaluatorFactory));
        #[cfg(feature = "perplexity")]
        registry.register(Arc::new(super::PerplexityEvaluatorFactory));

        registry
    }
}

impl std::fmt::Debug for EvaluatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluatorRegistry")
            .field("evaluators", &self.available_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crosscheck_core::{ProviderVerdict, Verdict};

    struct MockEvaluator {
        name: String,
    }

    #[async_trait]
    impl Evaluator for MockEvaluator {
        async fn evaluate(
            &self,
            _content: &str,
            _sources: &[String],
        ) -> Result<ProviderVerdict, ProviderError> {
            Ok(ProviderVerdict {
                provider: self.name.clone(),
                verdict: Verdict::Unverifiable,
                confidence: 50.0,
                raw_text: String::new(),
                sources: Default::default(),
            })
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    struct MockEvaluatorFactory;

    impl EvaluatorFactory for MockEvaluatorFactory {
        fn evaluator_type(&self) -> &'static str {
            "mock"
        }

        fn create(&self, config: &JsonValue) -> Result<Arc<dyn Evaluator>, ProviderError> {
            let name = config["name"].as_str().unwrap_or("mock-evaluator").to_string();
            Ok(Arc::new(MockEvaluator { name }))
        }

        fn validate_config(&self, _config: &JsonValue) -> Result<(), ProviderError> {
            Ok(())
        }

        fn description(&self) -> &'static str {
            "Mock evaluator for testing"
        }
    }

    #[test]
    fn test_registry_register_and_create() {
        let mut registry = EvaluatorRegistry::new();
        registry.register(Arc::new(MockEvaluatorFactory));

        assert!(registry.has_evaluator("mock"));
        assert!(!registry.has_evaluator("unknown"));

        let config = serde_json::json!({"name": "test-mock"});
        let evaluator = registry.create("mock", &config).unwrap();
        assert_eq!(evaluator.name(), "test-mock");
    }

    #[test]
    fn test_registry_unknown_evaluator() {
        let registry = EvaluatorRegistry::new();
        let result = registry.create("unknown", &serde_json::json!({}));

        match result {
            Err(ProviderError::NotConfigured(msg)) => {
                assert!(msg.contains("Unknown evaluator type"));
            }
            _ => panic!("Expected NotConfigured error"),
        }
    }

    #[test]
    fn test_registry_available_types() {
        let mut registry = EvaluatorRegistry::new();
        assert!(registry.available_types().is_empty());

        registry.register(Arc::new(MockEvaluatorFactory));
        assert_eq!(registry.available_types(), vec!["mock"]);
    }

    #[test]
    fn test_registry_validate() {
        let mut registry = EvaluatorRegistry::new();
        registry.register(Arc::new(MockEvaluatorFactory));

        assert!(registry.validate("mock", &serde_json::json!({})).is_ok());
        assert!(registry.validate("unknown", &serde_json::json!({})).is_err());
    }
}
