//! Mock session runtime for testing
//!
//! Records every call in order and can be configured to fail or stall.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{PersonaProfile, SessionRuntime};
use crate::error::{Error, Result};

/// How resource deletion should misbehave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteFailure {
    NotFound,
    Transport,
}

/// Configuration for mock runtime behavior
#[derive(Debug, Clone, Default)]
pub struct MockRuntimeConfig {
    pub fail_activate: bool,
    pub fail_generate_reply: bool,
    pub fail_interrupt: bool,
    pub fail_delete: Option<DeleteFailure>,
    /// Stall deletion for this long before answering
    pub delete_delay: Option<Duration>,
}

/// One recorded runtime call
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeEvent {
    Activated { persona_id: String, instance_id: Uuid },
    Reply { instructions: Option<String>, allow_interruptions: bool },
    Said { text: String, allow_interruptions: bool },
    ContextInjected { text: String },
    Interrupted,
    DeleteRequested { call_id: String },
}

pub struct MockRuntime {
    call_id: String,
    config: MockRuntimeConfig,
    events: RwLock<Vec<RuntimeEvent>>,
}

impl MockRuntime {
    pub fn new(call_id: impl Into<String>) -> Self {
        Self::with_config(call_id, MockRuntimeConfig::default())
    }

    pub fn with_config(call_id: impl Into<String>, config: MockRuntimeConfig) -> Self {
        Self {
            call_id: call_id.into(),
            config,
            events: RwLock::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<RuntimeEvent> {
        self.events.read().clone()
    }

    /// Number of reply generations, greetings included
    pub fn reply_count(&self) -> usize {
        self.events
            .read()
            .iter()
            .filter(|e| matches!(e, RuntimeEvent::Reply { .. }))
            .count()
    }

    /// Persona ids in activation order
    pub fn activations(&self) -> Vec<String> {
        self.events
            .read()
            .iter()
            .filter_map(|e| match e {
                RuntimeEvent::Activated { persona_id, .. } => Some(persona_id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.events
            .read()
            .iter()
            .filter_map(|e| match e {
                RuntimeEvent::Said { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.write().clear();
    }

    fn record(&self, event: RuntimeEvent) {
        self.events.write().push(event);
    }
}

#[async_trait]
impl SessionRuntime for MockRuntime {
    fn call_id(&self) -> &str {
        &self.call_id
    }

    async fn activate(&self, profile: &PersonaProfile) -> Result<()> {
        self.record(RuntimeEvent::Activated {
            persona_id: profile.persona_id.clone(),
            instance_id: profile.instance_id,
        });
        if self.config.fail_activate {
            return Err(Error::Runtime("mock activate failure".into()));
        }
        Ok(())
    }

    async fn generate_reply(&self, instructions: Option<&str>, allow_interruptions: bool) -> Result<()> {
        self.record(RuntimeEvent::Reply {
            instructions: instructions.map(String::from),
            allow_interruptions,
        });
        if self.config.fail_generate_reply {
            return Err(Error::Runtime("mock reply failure".into()));
        }
        Ok(())
    }

    async fn say(&self, text: &str, allow_interruptions: bool) -> Result<()> {
        self.record(RuntimeEvent::Said {
            text: text.to_string(),
            allow_interruptions,
        });
        Ok(())
    }

    async fn inject_context(&self, text: &str) -> Result<()> {
        self.record(RuntimeEvent::ContextInjected {
            text: text.to_string(),
        });
        Ok(())
    }

    async fn interrupt(&self) -> Result<()> {
        self.record(RuntimeEvent::Interrupted);
        if self.config.fail_interrupt {
            return Err(Error::Runtime("mock interrupt failure".into()));
        }
        Ok(())
    }

    async fn delete_call_resource(&self, call_id: &str) -> Result<()> {
        self.record(RuntimeEvent::DeleteRequested {
            call_id: call_id.to_string(),
        });
        if let Some(delay) = self.config.delete_delay {
            tokio::time::sleep(delay).await;
        }
        match self.config.fail_delete {
            Some(DeleteFailure::NotFound) => Err(Error::CallNotFound {
                call_id: call_id.to_string(),
            }),
            Some(DeleteFailure::Transport) => Err(Error::transport("call service", "connection reset")),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_in_order() {
        let runtime = MockRuntime::new("room-1");
        runtime.interrupt().await.unwrap();
        runtime.generate_reply(Some("say goodbye"), false).await.unwrap();

        assert_eq!(
            runtime.events(),
            vec![
                RuntimeEvent::Interrupted,
                RuntimeEvent::Reply {
                    instructions: Some("say goodbye".into()),
                    allow_interruptions: false
                },
            ]
        );
        assert_eq!(runtime.reply_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_failures() {
        let runtime = MockRuntime::with_config(
            "room-1",
            MockRuntimeConfig {
                fail_delete: Some(DeleteFailure::NotFound),
                ..Default::default()
            },
        );
        let err = runtime.delete_call_resource("room-1").await.unwrap_err();
        assert_eq!(err.kind(), "NotFoundOrAlreadyDeleted");
    }
}
