//! One live call.
//!
//! A [`CallSession`] owns the call's single active persona slot. Turns and
//! tool calls go through it; a handoff swaps the slot in one step so there
//! is never a moment with two current personas.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::memory::MemoryBridge;
use crate::orchestrator::persona::TOOL_UNAVAILABLE;
use crate::orchestrator::{ConversationSummary, Orchestrator, PersonaInstance, ToolOutcome};
use crate::session::{ContextHandle, SessionContext, SessionStore};
use crate::tools::{ToolCall, ToolSpec};

/// What a tool call did to the call
#[derive(Debug, Clone)]
pub enum ToolResult {
    /// Control moved to persona `to`
    Transferred { to: String, announcement: String },
    /// The active persona said `text`
    Replied(String),
    /// Tool output passed to the reply model
    Output(String),
    Ended(ConversationSummary),
}

pub struct CallSession {
    orchestrator: Orchestrator,
    store: Option<Arc<SessionStore>>,
    memory: MemoryBridge,
    call_id: String,
    context: ContextHandle,
    active: Option<PersonaInstance>,
    summary: Option<ConversationSummary>,
}

impl CallSession {
    /// Open the call's context and bring the entry persona on.
    ///
    /// Without a store the call runs on a persona-local context.
    pub async fn start(
        orchestrator: Orchestrator,
        store: Option<Arc<SessionStore>>,
        memory: MemoryBridge,
    ) -> Result<Self> {
        let call_id = orchestrator.runtime().call_id().to_string();
        let context = match &store {
            Some(store) => store.open(&call_id),
            None => ContextHandle::local(&call_id),
        };

        let mut entry = orchestrator.spawn_entry(context.clone())?;
        orchestrator.runtime().activate(&entry.profile()).await?;
        entry.enter().await;

        info!(
            call_id = %call_id,
            agent = %entry.id(),
            catalog = %orchestrator.catalog().source(),
            memory = memory.is_enabled(),
            "Call started"
        );

        Ok(Self {
            orchestrator,
            store,
            memory,
            call_id,
            context,
            active: Some(entry),
            summary: None,
        })
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_persona(&self) -> Option<&PersonaInstance> {
        self.active.as_ref()
    }

    /// Tools of the active persona
    pub fn tools(&self) -> &[ToolSpec] {
        self.active.as_ref().map(|p| p.tools()).unwrap_or(&[])
    }

    /// Context of the active persona (the last one once the call has ended)
    pub fn context(&self) -> &ContextHandle {
        &self.context
    }

    pub fn snapshot(&self) -> SessionContext {
        self.context.snapshot()
    }

    pub fn summary(&self) -> Option<&ConversationSummary> {
        self.summary.as_ref()
    }

    fn persona_mut(&mut self) -> Result<&mut PersonaInstance> {
        self.active.as_mut().ok_or_else(|| Error::CallNotFound {
            call_id: self.call_id.clone(),
        })
    }

    // ─────────────────────────────────────────────────────────────
    // Turns
    // ─────────────────────────────────────────────────────────────

    /// Handle one caller utterance: memory bridge, then a reply
    pub async fn user_turn(&mut self, text: &str) -> Result<()> {
        let persona = self.active.as_ref().ok_or_else(|| Error::CallNotFound {
            call_id: self.call_id.clone(),
        })?;

        let memory_on = self.memory.is_enabled()
            && self.orchestrator.catalog().session().memory_enabled
            && persona.definition().capabilities.memory;
        if memory_on {
            let user_id = persona
                .context()
                .read(|ctx| ctx.memory_user_id().map(String::from))
                .unwrap_or_else(|| self.call_id.clone());
            if let Some(injected) = self.memory.before_reply(&user_id, text).await {
                if let Err(e) = self.orchestrator.runtime().inject_context(&injected).await {
                    warn!(call_id = %self.call_id, error = %e, "Failed to inject memories");
                }
            }
        }

        if let Err(e) = self.orchestrator.runtime().generate_reply(None, true).await {
            warn!(call_id = %self.call_id, error = %e, "Failed to generate reply");
        }
        Ok(())
    }

    /// Run a model tool call by name with JSON arguments
    pub async fn invoke_tool(&mut self, name: &str, args: &Value) -> Result<ToolResult> {
        let call = match ToolCall::parse(name, args) {
            Ok(call) => call,
            Err(e) => {
                warn!(call_id = %self.call_id, tool = %name, error = %e, "Unusable tool call");
                self.persona_mut()?;
                return Ok(self.reply(TOOL_UNAVAILABLE.to_string()).await);
            }
        };

        let outcome = self.persona_mut()?.invoke(call).await;
        match outcome {
            ToolOutcome::Handoff { next, announcement } => {
                let to = next.id().to_string();
                self.switch_to(*next, &announcement).await;
                Ok(ToolResult::Transferred { to, announcement })
            }
            ToolOutcome::Reply { text } => Ok(self.reply(text).await),
            ToolOutcome::Output { text } => {
                if let Err(e) = self.orchestrator.runtime().generate_reply(Some(&text), true).await {
                    warn!(call_id = %self.call_id, error = %e, "Failed to generate reply");
                }
                Ok(ToolResult::Output(text))
            }
            ToolOutcome::Ended { summary } => {
                self.finish(summary.clone());
                Ok(ToolResult::Ended(summary))
            }
        }
    }

    /// End the call from the host side (hang-up, end of input)
    pub async fn end(&mut self) -> Option<ConversationSummary> {
        let persona = self.active.as_mut()?;
        let summary = persona.end_conversation().await;
        self.finish(summary.clone());
        Some(summary)
    }

    async fn reply(&self, text: String) -> ToolResult {
        if let Err(e) = self.orchestrator.runtime().say(&text, true).await {
            warn!(call_id = %self.call_id, error = %e, "Failed to speak reply");
        }
        ToolResult::Replied(text)
    }

    /// Speak the announcement in the outgoing voice, then install `next`
    async fn switch_to(&mut self, mut next: PersonaInstance, announcement: &str) {
        let runtime = Arc::clone(self.orchestrator.runtime());
        if let Err(e) = runtime.say(announcement, true).await {
            warn!(call_id = %self.call_id, error = %e, "Failed to speak transfer announcement");
        }

        if let Err(e) = runtime.activate(&next.profile()).await {
            warn!(call_id = %self.call_id, agent = %next.id(), error = %e, "Runtime failed to activate agent");
        }
        self.context = next.context().clone();
        next.enter().await;
        // The outgoing instance has already exited and is dropped here
        self.active = Some(next);
    }

    fn finish(&mut self, summary: ConversationSummary) {
        self.active = None;
        if let Some(store) = &self.store {
            store.close(&self.call_id);
        }
        info!(call_id = %self.call_id, "Call ended");
        self.summary = Some(summary);
    }
}
