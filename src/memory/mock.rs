//! Mock memory backend for testing

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{MemoryBackend, MemoryHit};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct MockMemory {
    hits: Vec<MemoryHit>,
    fail: bool,
    delay: Option<Duration>,
    stored: RwLock<Vec<(String, String)>>,
    searches: RwLock<Vec<(String, String)>>,
}

impl MockMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every search answers with `hits`
    pub fn with_hits(hits: Vec<MemoryHit>) -> Self {
        Self {
            hits,
            ..Default::default()
        }
    }

    /// Every call fails with a transport error
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Every call stalls for `delay` first
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    /// (user_id, text) pairs passed to `add_memory`
    pub fn stored(&self) -> Vec<(String, String)> {
        self.stored.read().clone()
    }

    pub fn add_count(&self) -> usize {
        self.stored.read().len()
    }

    pub fn search_count(&self) -> usize {
        self.searches.read().len()
    }

    /// User ids searches were filtered on
    pub fn searched_users(&self) -> Vec<String> {
        self.searches.read().iter().map(|(user, _)| user.clone()).collect()
    }

    async fn behave(&self) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(Error::MemoryTransport {
                message: "mock memory failure".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MemoryBackend for MockMemory {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn add_memory(&self, text: &str, user_id: &str) -> Result<()> {
        self.stored.write().push((user_id.to_string(), text.to_string()));
        self.behave().await
    }

    async fn search_memory(&self, query: &str, user_id: &str) -> Result<Vec<MemoryHit>> {
        self.searches.write().push((user_id.to_string(), query.to_string()));
        self.behave().await?;
        Ok(self.hits.clone())
    }
}
