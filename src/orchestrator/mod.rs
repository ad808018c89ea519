//! Handoff orchestration.
//!
//! An [`Orchestrator`] bundles the per-call services every persona instance
//! needs: the catalog, the factory that builds instances, the session
//! runtime and the call's metadata. It is cheap to clone and each instance
//! holds its own copy.

pub mod behavior;
pub mod factory;
pub mod handoff;
pub mod persona;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::CallSettings;
use crate::error::Result;
use crate::persona::PersonaCatalog;
use crate::runtime::SessionRuntime;
use crate::session::ContextHandle;

pub use behavior::{behavior_for, PersonaBehavior};
pub use factory::{CatalogFactory, PersonaFactory, PersonaRequest};
pub use handoff::{
    HandoffController, HandoffOutcome, HandoffPayload, RejectionReason, ValidatedHandoff,
    TRANSFER_FALLBACK,
};
pub use persona::{PersonaInstance, ToolOutcome};

// ─────────────────────────────────────────────────────────────────
// Options and Metadata
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Calls with this id never have their resource deleted
    pub mock_call_id: String,
    pub cleanup_timeout: Duration,
    pub goodbye_instructions: String,
}

impl From<&CallSettings> for OrchestratorOptions {
    fn from(settings: &CallSettings) -> Self {
        Self {
            mock_call_id: settings.mock_call_id.clone(),
            cleanup_timeout: settings.cleanup_timeout(),
            goodbye_instructions: settings.goodbye_instructions.clone(),
        }
    }
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self::from(&CallSettings::default())
    }
}

/// Caller details supplied by the host when the call starts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallMetadata {
    /// Stable id of the human; the memory correlation key
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
}

// ─────────────────────────────────────────────────────────────────
// Summary
// ─────────────────────────────────────────────────────────────────

/// What happened to the call resource at the end of a call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CleanupStatus {
    Deleted,
    /// Offline call id, nothing to delete
    Skipped,
    Failed { error_kind: String, message: String },
}

/// Logged and returned when a conversation ends
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub call_id: String,
    pub total_handoffs: u32,
    pub agents_used: Vec<String>,
    pub handoff_errors: usize,
    pub conversation_duration_secs: Option<f64>,
    pub cleanup: CleanupStatus,
}

// ─────────────────────────────────────────────────────────────────
// Orchestrator
// ─────────────────────────────────────────────────────────────────

struct Inner {
    catalog: Arc<PersonaCatalog>,
    factory: Arc<dyn PersonaFactory>,
    runtime: Arc<dyn SessionRuntime>,
    options: OrchestratorOptions,
    metadata: CallMetadata,
}

#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn builder(catalog: Arc<PersonaCatalog>, runtime: Arc<dyn SessionRuntime>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            catalog,
            runtime,
            factory: Arc::new(CatalogFactory),
            options: OrchestratorOptions::default(),
            metadata: CallMetadata::default(),
        }
    }

    pub fn catalog(&self) -> &PersonaCatalog {
        &self.inner.catalog
    }

    pub fn runtime(&self) -> &Arc<dyn SessionRuntime> {
        &self.inner.runtime
    }

    pub fn factory(&self) -> &dyn PersonaFactory {
        self.inner.factory.as_ref()
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.inner.options
    }

    pub fn metadata(&self) -> &CallMetadata {
        &self.inner.metadata
    }

    /// Memory correlation key: the caller's user id, else the call id
    pub fn memory_key(&self) -> String {
        self.inner
            .metadata
            .user_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| self.inner.runtime.call_id().to_string())
    }

    /// Build the persona that answers the call
    pub fn spawn_entry(&self, context: ContextHandle) -> Result<PersonaInstance> {
        self.spawn(&self.catalog().entry().id, HandoffPayload::new(), context)
    }

    pub fn spawn(&self, id: &str, payload: HandoffPayload, context: ContextHandle) -> Result<PersonaInstance> {
        let definition = self.catalog().require(id)?;
        self.factory().create(
            self,
            PersonaRequest {
                definition,
                payload,
                context,
            },
        )
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("call_id", &self.inner.runtime.call_id())
            .field("catalog", &self.inner.catalog.source())
            .field("options", &self.inner.options)
            .field("metadata", &self.inner.metadata)
            .finish()
    }
}

pub struct OrchestratorBuilder {
    catalog: Arc<PersonaCatalog>,
    runtime: Arc<dyn SessionRuntime>,
    factory: Arc<dyn PersonaFactory>,
    options: OrchestratorOptions,
    metadata: CallMetadata,
}

impl OrchestratorBuilder {
    pub fn factory(mut self, factory: Arc<dyn PersonaFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn metadata(mut self, metadata: CallMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn build(self) -> Orchestrator {
        Orchestrator {
            inner: Arc::new(Inner {
                catalog: self.catalog,
                factory: self.factory,
                runtime: self.runtime,
                options: self.options,
                metadata: self.metadata,
            }),
        }
    }
}
