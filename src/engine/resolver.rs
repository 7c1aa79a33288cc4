// src/engine/resolver.rs — Map "provider/model" identifiers to engine instances

use std::sync::Arc;

use super::google::GoogleEngine;
use super::openai::OpenAIEngine;
use super::retry::RetryEngine;
use super::{Engine, EngineRef};
use crate::infra::config::Credentials;
use crate::infra::errors::CitemeterError;

/// Resolve one `"provider/model"` identifier to a concrete engine.
///
/// The provider half selects the adapter from a fixed registry; the model
/// half passes through verbatim — unknown models surface as provider errors
/// at call time, not here. Resolving the same identifier twice yields
/// functionally equivalent engines.
pub fn resolve(name: &str, creds: &Credentials) -> Result<Arc<dyn Engine>, CitemeterError> {
    let engine_ref = EngineRef::parse(name)?;
    resolve_ref(&engine_ref, creds)
}

pub fn resolve_ref(
    engine_ref: &EngineRef,
    creds: &Credentials,
) -> Result<Arc<dyn Engine>, CitemeterError> {
    match engine_ref.provider.as_str() {
        "openai" => {
            let key = require_key(creds.openai_api_key.as_deref(), "OPENAI_API_KEY")?;
            Ok(Arc::new(OpenAIEngine::new(&engine_ref.model, key)))
        }
        "google" => {
            let key = require_key(creds.google_api_key.as_deref(), "GOOGLE_API_KEY")?;
            // Gemini free-tier quotas are bursty; wrap in retry with backoff.
            let inner: Arc<dyn Engine> = Arc::new(GoogleEngine::new(&engine_ref.model, key));
            Ok(Arc::new(RetryEngine::new(inner)))
        }
        other => Err(CitemeterError::UnsupportedProvider {
            provider: other.to_string(),
        }),
    }
}

/// Resolve every identifier up front so a bad task fails before any
/// network activity.
pub fn resolve_all(
    names: &[String],
    creds: &Credentials,
) -> Result<Vec<Arc<dyn Engine>>, CitemeterError> {
    names.iter().map(|name| resolve(name, creds)).collect()
}

fn require_key(key: Option<&str>, env_var: &str) -> Result<String, CitemeterError> {
    key.map(str::to_string)
        .ok_or_else(|| CitemeterError::Config(format!("{env_var} is not set")))
}
