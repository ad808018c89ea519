//! Conversation memory: an optional long-term store the caller's
//! utterances are written to and related memories are read back from.

pub mod bridge;
pub mod mem0;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use bridge::{format_memories, MemoryBridge};
pub use mem0::Mem0Client;
pub use mock::MockMemory;

/// One retrieved memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryHit {
    pub content: String,
    pub source: String,
}

/// Minimal add/search contract of a memory service
#[async_trait]
pub trait MemoryBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Persist a user utterance. Fails with transport or auth errors.
    async fn add_memory(&self, text: &str, user_id: &str) -> Result<()>;

    /// Memories related to `query`, restricted to `user_id`
    async fn search_memory(&self, query: &str, user_id: &str) -> Result<Vec<MemoryHit>>;
}
