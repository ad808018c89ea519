//! Per-turn memory bridge.
//!
//! Before a reply is generated the caller's utterance is stored and related
//! memories are fetched. Both steps are bounded by a timeout and never fail
//! the turn; a bridge without a backend is a pass-through.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::{Mem0Client, MemoryBackend, MemoryHit};
use crate::config::MemorySettings;
use crate::error::{Error, Result};

#[derive(Clone)]
pub struct MemoryBridge {
    backend: Option<Arc<dyn MemoryBackend>>,
    timeout: Duration,
}

impl MemoryBridge {
    pub fn new(backend: Arc<dyn MemoryBackend>, timeout: Duration) -> Self {
        Self {
            backend: Some(backend),
            timeout,
        }
    }

    pub fn disabled() -> Self {
        Self {
            backend: None,
            timeout: Duration::from_secs(0),
        }
    }

    /// Bridge over the Mem0 service, or a pass-through when memory is off.
    pub fn from_settings(settings: &MemorySettings) -> Self {
        if !settings.is_active() {
            debug!("Memory backend not configured, bridge disabled");
            return Self::disabled();
        }
        match Mem0Client::new(settings) {
            Ok(client) => Self::new(Arc::new(client), settings.timeout()),
            Err(e) => {
                warn!(error = %e, "Failed to create memory client, bridge disabled");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Store `text` and return the context to inject, if any memories matched
    pub async fn before_reply(&self, user_id: &str, text: &str) -> Option<String> {
        let backend = self.backend.as_ref()?;
        if text.trim().is_empty() {
            return None;
        }

        if let Err(e) = self
            .bounded("add", backend.add_memory(text, user_id))
            .await
        {
            warn!(
                backend = backend.name(),
                user_id = %user_id,
                error_kind = e.kind(),
                error = %e,
                "Failed to store memory"
            );
        }

        match self
            .bounded("search", backend.search_memory(text, user_id))
            .await
        {
            Ok(hits) if hits.is_empty() => None,
            Ok(hits) => {
                debug!(backend = backend.name(), count = hits.len(), "Memories retrieved");
                Some(format_memories(&hits))
            }
            Err(e) => {
                warn!(
                    backend = backend.name(),
                    user_id = %user_id,
                    error_kind = e.kind(),
                    error = %e,
                    "Failed to search memories"
                );
                None
            }
        }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::MemoryTimeout {
                operation,
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

impl std::fmt::Debug for MemoryBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBridge")
            .field("backend", &self.backend.as_ref().map(|b| b.name()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Text injected ahead of the reply
pub fn format_memories(hits: &[MemoryHit]) -> String {
    let entries: Vec<String> = hits
        .iter()
        .map(|hit| format!("Source: {}\nContent: {}\n", hit.source, hit.content))
        .collect();
    format!("Relevant memories:\n\n{}", entries.join("\n\n"))
}
