//! HTTP client for the Mem0 memory service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use super::{MemoryBackend, MemoryHit};
use crate::config::MemorySettings;
use crate::error::{Error, Result};

const DEFAULT_SOURCE: &str = "mem0 Memories";

pub struct Mem0Client {
    client: Client,
    base_url: String,
    api_key: String,
}

impl Mem0Client {
    pub fn new(settings: &MemorySettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::config_field_invalid("memory.api_key", "memory API key is not set"))?;

        let client = Client::builder()
            .timeout(settings.timeout() + Duration::from_millis(500))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Memory service request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::MemoryTransport {
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::MemoryAuth {
                message: format!("{} returned {}", path, status),
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::MemoryTransport {
                message: format!("{} returned {}: {}", path, status, text),
            });
        }

        response.json().await.map_err(|e| Error::MemoryTransport {
            message: format!("invalid response from {}: {}", path, e),
        })
    }
}

#[async_trait]
impl MemoryBackend for Mem0Client {
    fn name(&self) -> &'static str {
        "mem0"
    }

    async fn add_memory(&self, text: &str, user_id: &str) -> Result<()> {
        let body = json!({
            "messages": [{ "role": "user", "content": text }],
            "user_id": user_id,
        });
        self.post("/v1/memories/", body).await.map(|_| ())
    }

    async fn search_memory(&self, query: &str, user_id: &str) -> Result<Vec<MemoryHit>> {
        let body = json!({
            "query": query,
            "filters": { "AND": [{ "user_id": user_id }] },
        });
        let response = self.post("/v2/memories/search/", body).await?;
        Ok(parse_search_response(&response))
    }
}

/// Accepts either a bare list or `{"results": [...]}`
pub(crate) fn parse_search_response(response: &Value) -> Vec<MemoryHit> {
    let items = match response {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => map
            .get("results")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    };

    items
        .iter()
        .filter_map(|item| {
            item.get("memory")
                .or_else(|| item.get("text"))
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
        })
        .map(split_source)
        .collect()
}

/// Pull a "from [source]" attribution out of a memory's text
pub(crate) fn split_source(text: &str) -> MemoryHit {
    if let Some((_, after)) = text.split_once("from [") {
        if let Some((source, rest)) = after.split_once(']') {
            return MemoryHit {
                content: rest.trim().to_string(),
                source: source.to_string(),
            };
        }
    }
    MemoryHit {
        content: text.trim().to_string(),
        source: DEFAULT_SOURCE.to_string(),
    }
}
