// src/engine/mod.rs — LLM engine layer

pub mod extract;
pub mod google;
pub mod openai;
pub mod resolver;
pub mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::infra::errors::CitemeterError;

/// Core trait that all engines implement.
///
/// An engine is one provider/model pair. `run` sends a single prompt and
/// returns a normalized response, however the provider shapes its payload.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Identity in `"provider/model"` form.
    fn name(&self) -> &str;

    async fn run(&self, prompt: &str) -> Result<EngineResponse, CitemeterError>;
}

/// Normalized LLM response: final text, deduplicated citations in first-seen
/// order, and the raw payload retained for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineResponse {
    pub content: String,
    pub cites: Vec<String>,
    pub raw: serde_json::Value,
}

/// Reference to a specific model on a specific provider.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct EngineRef {
    pub provider: String,
    pub model: String,
}

impl EngineRef {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }

    /// Parse `"provider/model"`. Splits on the first `/`; the model may
    /// itself contain slashes. Both halves must be non-empty.
    pub fn parse(s: &str) -> Result<Self, CitemeterError> {
        let (provider, model) = s.split_once('/').ok_or_else(|| {
            CitemeterError::Config(format!(
                "Engine name '{s}' must follow '<provider>/<model>' format"
            ))
        })?;
        if provider.is_empty() || model.is_empty() {
            return Err(CitemeterError::Config(format!(
                "Engine name '{s}' must include both provider and model"
            )));
        }
        Ok(Self {
            provider: provider.to_string(),
            model: model.to_string(),
        })
    }
}

impl std::fmt::Display for EngineRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_engine_ref_parse() {
        let r = EngineRef::parse("openai/gpt-4.1").unwrap();
        assert_eq!(r.provider, "openai");
        assert_eq!(r.model, "gpt-4.1");
    }

    #[test]
    fn test_engine_ref_parse_model_with_slash() {
        // Only the first slash splits; the rest belongs to the model.
        let r = EngineRef::parse("openai/org/custom-model").unwrap();
        assert_eq!(r.provider, "openai");
        assert_eq!(r.model, "org/custom-model");
    }

    #[test]
    fn test_engine_ref_parse_no_slash() {
        let err = EngineRef::parse("bogus").unwrap_err();
        assert!(err.to_string().contains("provider>/<model"));
    }

    #[test]
    fn test_engine_ref_parse_empty_parts() {
        assert!(EngineRef::parse("/model").is_err());
        assert!(EngineRef::parse("provider/").is_err());
        assert!(EngineRef::parse("").is_err());
    }

    #[test]
    fn test_engine_ref_display() {
        let r = EngineRef::new("google", "gemini-2.0-flash");
        assert_eq!(r.to_string(), "google/gemini-2.0-flash");
    }
}
