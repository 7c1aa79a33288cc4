// src/engine/google.rs — Google Gemini engine with the google_search tool

use async_trait::async_trait;

use super::extract::{collect_urls, dedupe};
use super::{Engine, EngineResponse};
use crate::infra::errors::CitemeterError;

pub struct GoogleEngine {
    model: String,
    name: String,
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GoogleEngine {
    pub fn new(model: impl Into<String>, api_key: String) -> Self {
        Self::with_base_url(
            model,
            api_key,
            "https://generativelanguage.googleapis.com/v1beta".into(),
        )
    }

    pub fn with_base_url(model: impl Into<String>, api_key: String, base_url: String) -> Self {
        let model = model.into();
        Self {
            name: format!("google/{model}"),
            model,
            api_key,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn build_request_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }],
            }],
            "tools": [{ "google_search": {} }],
        })
    }
}

#[async_trait]
impl Engine for GoogleEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, prompt: &str) -> Result<EngineResponse, CitemeterError> {
        let body = self.build_request_body(prompt);

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key,
        );

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CitemeterError::Engine {
                provider: "google".into(),
                message: e.to_string(),
                retriable: e.is_timeout() || e.is_connect(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CitemeterError::RateLimited {
                provider: "google".into(),
                retry_after_ms: 5000,
            });
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(CitemeterError::Engine {
                provider: "google".into(),
                message: format!("HTTP {}: {}", status, error_body),
                retriable: status.is_server_error(),
            });
        }

        let resp: serde_json::Value =
            response.json().await.map_err(|e| CitemeterError::Engine {
                provider: "google".into(),
                message: format!("Failed to parse response: {}", e),
                retriable: false,
            })?;

        let content = extract_content(&resp);
        let cites = extract_citations(&resp);

        Ok(EngineResponse {
            content,
            cites,
            raw: resp,
        })
    }
}

/// Join the text parts of the first candidate; dump the payload if the
/// shape is unexpected.
fn extract_content(resp: &serde_json::Value) -> String {
    let mut chunks: Vec<String> = Vec::new();
    if let Some(parts) = resp["candidates"][0]["content"]["parts"].as_array() {
        for part in parts {
            if let Some(text) = part["text"].as_str() {
                if !text.is_empty() {
                    chunks.push(text.to_string());
                }
            }
        }
    }
    if !chunks.is_empty() {
        return chunks.join("\n");
    }

    resp.to_string()
}

/// Grounding metadata URIs first, then the whole-payload walk; union
/// deduplicated in first-seen order.
fn extract_citations(resp: &serde_json::Value) -> Vec<String> {
    let mut cites: Vec<String> = Vec::new();

    if let Some(candidates) = resp["candidates"].as_array() {
        for candidate in candidates {
            let Some(chunks) = candidate["groundingMetadata"]["groundingChunks"].as_array() else {
                continue;
            };
            for chunk in chunks {
                if let Some(uri) = chunk["web"]["uri"].as_str() {
                    cites.push(uri.to_string());
                }
            }
        }
    }

    cites.extend(collect_urls(resp));
    dedupe(cites)
}
