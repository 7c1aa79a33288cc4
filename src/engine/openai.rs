// src/engine/openai.rs — OpenAI Responses API engine with web_search enabled

use async_trait::async_trait;

use super::extract::{collect_urls, dedupe};
use super::{Engine, EngineResponse};
use crate::infra::errors::CitemeterError;

pub struct OpenAIEngine {
    model: String,
    name: String,
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAIEngine {
    pub fn new(model: impl Into<String>, api_key: String) -> Self {
        Self::with_base_url(model, api_key, "https://api.openai.com/v1".into())
    }

    pub fn with_base_url(model: impl Into<String>, api_key: String, base_url: String) -> Self {
        let model = model.into();
        Self {
            name: format!("openai/{model}"),
            model,
            api_key,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn build_request_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "input": prompt,
            "tools": [{ "type": "web_search" }],
        })
    }
}

#[async_trait]
impl Engine for OpenAIEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, prompt: &str) -> Result<EngineResponse, CitemeterError> {
        let body = self.build_request_body(prompt);

        let response = self
            .client
            .post(format!("{}/responses", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| CitemeterError::Engine {
                provider: "openai".into(),
                message: e.to_string(),
                retriable: e.is_timeout() || e.is_connect(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CitemeterError::RateLimited {
                provider: "openai".into(),
                retry_after_ms: 5000,
            });
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            // A 400 naming web_search means the tool is not enabled for the
            // account or plan, which retrying cannot fix.
            if status == reqwest::StatusCode::BAD_REQUEST
                && error_body.to_lowercase().contains("web_search")
            {
                return Err(CitemeterError::Capability {
                    provider: "openai".into(),
                    message: "web_search is not enabled for this account or plan. \
                              Enable the capability on your OpenAI plan to continue."
                        .into(),
                });
            }
            return Err(CitemeterError::Engine {
                provider: "openai".into(),
                message: format!("HTTP {}: {}", status, error_body),
                retriable: status.is_server_error(),
            });
        }

        let resp: serde_json::Value =
            response.json().await.map_err(|e| CitemeterError::Engine {
                provider: "openai".into(),
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

/// Best-effort content extraction. Joins `output_text` blocks from the
/// Responses API output; falls back to a dump of the whole payload so `run`
/// never comes back empty on an unexpected schema.
fn extract_content(resp: &serde_json::Value) -> String {
    if let Some(text) = resp["output_text"].as_str() {
        if !text.is_empty() {
            return text.to_string();
        }
    }

    // Chat-completions shape, for responses proxied through that API.
    if let Some(text) = resp["choices"][0]["message"]["content"].as_str() {
        if !text.is_empty() {
            return text.to_string();
        }
    }

    let mut chunks: Vec<String> = Vec::new();
    if let Some(output) = resp["output"].as_array() {
        for item in output {
            let Some(content) = item["content"].as_array() else {
                continue;
            };
            for block in content {
                if block["type"] == "output_text" {
                    if let Some(text) = block["text"].as_str() {
                        chunks.push(text.to_string());
                    }
                }
            }
        }
    }
    if !chunks.is_empty() {
        return chunks.join("\n");
    }

    resp.to_string()
}

/// Structured `url_citation` annotations, then the whole-payload walk as the
/// fallback tier; union deduplicated in first-seen order.
fn extract_citations(resp: &serde_json::Value) -> Vec<String> {
    let mut cites: Vec<String> = Vec::new();

    if let Some(output) = resp["output"].as_array() {
        for item in output {
            let Some(content) = item["content"].as_array() else {
                continue;
            };
            for block in content {
                let Some(annotations) = block["annotations"].as_array() else {
                    continue;
                };
                for annotation in annotations {
                    if annotation["type"] == "url_citation" {
                        if let Some(url) = annotation["url"].as_str() {
                            cites.push(url.to_string());
                        }
                    }
                }
            }
        }
    }

    cites.extend(collect_urls(resp));
    dedupe(cites)
}
