//! Session runtime boundary.
//!
//! The host voice session (speech pipeline, reply model, call resource) is
//! external. The orchestrator only talks to it through [`SessionRuntime`].

pub mod console;
pub mod mock;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::persona::VoiceIdentity;
use crate::tools::ToolSpec;

pub use console::ConsoleRuntime;
pub use mock::{MockRuntime, MockRuntimeConfig, RuntimeEvent};

/// What the runtime needs to install a persona instance as the active handler
#[derive(Debug, Clone, Serialize)]
pub struct PersonaProfile {
    pub instance_id: Uuid,
    pub persona_id: String,
    pub name: String,
    pub instructions: String,
    pub voice: VoiceIdentity,
    pub tools: Vec<ToolSpec>,
}

/// Host call session contract
#[async_trait]
pub trait SessionRuntime: Send + Sync {
    /// Stable identifier of the call, used for correlation and cleanup
    fn call_id(&self) -> &str;

    /// Install a persona instance as the call's active handler
    async fn activate(&self, profile: &PersonaProfile) -> Result<()>;

    /// Produce and speak a reply; resolves once speech is queued
    async fn generate_reply(&self, instructions: Option<&str>, allow_interruptions: bool) -> Result<()>;

    /// Speak fixed text verbatim
    async fn say(&self, text: &str, allow_interruptions: bool) -> Result<()>;

    /// Add context ahead of the next reply
    async fn inject_context(&self, text: &str) -> Result<()>;

    /// Stop any in-flight speech immediately
    async fn interrupt(&self) -> Result<()>;

    /// Best-effort deletion of the call resource.
    ///
    /// Fails with [`crate::error::Error::CallNotFound`] or
    /// [`crate::error::Error::Transport`].
    async fn delete_call_resource(&self, call_id: &str) -> Result<()>;
}
