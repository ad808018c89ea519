//! One activation of a persona.
//!
//! A [`PersonaInstance`] is built fresh every time a persona becomes active
//! and is discarded once it hands off or the call ends. The shared
//! [`ContextHandle`] is what carries state from one instance to the next.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::behavior::{self, behavior_for, PersonaBehavior};
use super::handoff::{HandoffController, HandoffOutcome, HandoffPayload, RejectionReason};
use super::{CleanupStatus, ConversationSummary, Orchestrator, PersonaRequest};
use crate::error::Error;
use crate::persona::PersonaDefinition;
use crate::runtime::PersonaProfile;
use crate::session::{AgentEntry, AgentExit, ContextHandle, ContextUpdate, ConversationTurn, ExitReason};
use crate::tools::{time, ToolCall, ToolSpec};

/// Reply for a tool the active persona does not offer
pub const TOOL_UNAVAILABLE: &str = "I'm sorry, I can't help with that right now.";

/// Result of invoking one tool on the active persona
#[derive(Debug)]
pub enum ToolOutcome {
    /// Switch to `next` after speaking `announcement`
    Handoff {
        next: Box<PersonaInstance>,
        announcement: String,
    },
    /// Spoken verbatim by the current persona
    Reply { text: String },
    /// Tool result handed back to the reply model
    Output { text: String },
    /// The call is over
    Ended { summary: ConversationSummary },
}

pub struct PersonaInstance {
    instance_id: Uuid,
    definition: Arc<PersonaDefinition>,
    behavior: &'static dyn PersonaBehavior,
    instructions: String,
    tools: Vec<ToolSpec>,
    payload: HandoffPayload,
    context: ContextHandle,
    orchestrator: Orchestrator,
    started_at: Option<DateTime<Utc>>,
    exited: bool,
}

impl PersonaInstance {
    pub(crate) fn new(
        orchestrator: Orchestrator,
        definition: Arc<PersonaDefinition>,
        instructions: String,
        tools: Vec<ToolSpec>,
        payload: HandoffPayload,
        context: ContextHandle,
    ) -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            behavior: behavior_for(definition.kind),
            definition,
            instructions,
            tools,
            payload,
            context,
            orchestrator,
            started_at: None,
            exited: false,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &PersonaDefinition {
        &self.definition
    }

    pub fn behavior(&self) -> &'static dyn PersonaBehavior {
        self.behavior
    }

    /// Rendered instructions for this activation
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn tools(&self) -> &[ToolSpec] {
        &self.tools
    }

    pub fn payload(&self) -> &HandoffPayload {
        &self.payload
    }

    pub fn context(&self) -> &ContextHandle {
        &self.context
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn has_exited(&self) -> bool {
        self.exited
    }

    pub fn exposes(&self, tool_name: &str) -> bool {
        self.tools.iter().any(|t| t.name == tool_name)
    }

    /// What the runtime needs to install this instance
    pub fn profile(&self) -> PersonaProfile {
        PersonaProfile {
            instance_id: self.instance_id,
            persona_id: self.definition.id.clone(),
            name: self.definition.name.clone(),
            instructions: self.instructions.clone(),
            voice: self.definition.voice.clone(),
            tools: self.tools.clone(),
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────

    /// Mark this instance active and greet the caller
    pub async fn enter(&mut self) {
        let now = Utc::now();
        self.started_at = Some(now);
        self.context.update_all([
            ContextUpdate::Entered(AgentEntry {
                agent: self.definition.id.clone(),
                timestamp: now,
            }),
            ContextUpdate::MemoryUserId(self.orchestrator.memory_key()),
        ]);

        let (previous, handoffs) = self.context.read(|ctx| {
            (ctx.previous_agent().map(String::from), ctx.handoff_count())
        });
        info!(
            agent = %self.definition.id,
            name = %self.definition.name,
            previous_agent = previous.as_deref().unwrap_or("none"),
            handoff_count = handoffs,
            call_id = %self.orchestrator.runtime().call_id(),
            "Agent entered"
        );

        if let Err(e) = self.orchestrator.runtime().generate_reply(None, true).await {
            warn!(agent = %self.definition.id, error = %e, "Failed to generate greeting");
        }
    }

    /// Close this activation. Returns false if it was already closed.
    pub fn exit(&mut self, reason: ExitReason) -> bool {
        if self.exited {
            debug!(agent = %self.definition.id, reason = %reason, "Exit ignored, already exited");
            return false;
        }
        self.exited = true;

        let now = Utc::now();
        let duration_secs = self
            .started_at
            .map(|start| (now - start).num_milliseconds() as f64 / 1000.0);
        self.context.update(ContextUpdate::Exited(AgentExit {
            agent: self.definition.id.clone(),
            timestamp: now,
            reason,
            duration_secs,
        }));

        info!(
            agent = %self.definition.id,
            reason = %reason,
            duration_secs = ?duration_secs,
            "Agent exited"
        );
        true
    }

    /// Resume after a failed handoff, without a new greeting.
    ///
    /// The activation clock keeps running from the original entry.
    fn resume(&mut self) {
        self.exited = false;
        self.context.update(ContextUpdate::Entered(AgentEntry {
            agent: self.definition.id.clone(),
            timestamp: Utc::now(),
        }));
    }

    /// Hand the call to `target`.
    ///
    /// Never fails: a refused or broken transfer leaves this instance active
    /// and yields the fallback reply.
    pub fn request_handoff(&mut self, target: &str, payload: HandoffPayload) -> HandoffOutcome {
        let source = self.definition.id.clone();

        let validated = if self.exited {
            Err(RejectionReason::AlreadyExited)
        } else {
            HandoffController::validate(
                self.orchestrator.catalog(),
                &self.definition,
                target,
                &self.context,
            )
        };
        let validated = match validated {
            Ok(validated) => validated,
            Err(reason) => {
                warn!(source = %source, target = %target, reason = %reason, "Handoff rejected");
                return HandoffOutcome::fallback();
            }
        };

        let target = Arc::clone(&validated.target);
        self.exit(ExitReason::Handoff);

        let request = PersonaRequest {
            definition: Arc::clone(&target),
            payload: payload.clone(),
            context: self.context.for_successor(),
        };
        match self.orchestrator.factory().create(&self.orchestrator, request) {
            Ok(next) => {
                let reason = behavior::arrival_reason(&target);
                HandoffController::record_success(
                    &self.context,
                    &source,
                    &target.id,
                    reason,
                    &payload,
                    validated.cycle_detected,
                );
                info!(
                    source = %source,
                    target = %target.id,
                    reason = reason,
                    handoff_count = self.context.read(|ctx| ctx.handoff_count()),
                    "Handoff completed"
                );
                HandoffOutcome::Handoff {
                    next: Box::new(next),
                    announcement: behavior::announcement(&target, payload.topic()),
                }
            }
            Err(e) => {
                HandoffController::record_failure(&self.context, &source, &target.id, &e);
                error!(
                    source = %source,
                    target = %target.id,
                    error_kind = e.kind(),
                    error = %e,
                    "Handoff failed, staying with current agent"
                );
                self.resume();
                HandoffOutcome::fallback()
            }
        }
    }

    /// Close the call: summary, interrupt, goodbye, then resource cleanup
    pub async fn end_conversation(&mut self) -> ConversationSummary {
        self.exit(ExitReason::EndConversation);

        let runtime = Arc::clone(self.orchestrator.runtime());
        let call_id = runtime.call_id().to_string();
        let mut summary = self.context.read(|ctx| ConversationSummary {
            call_id: call_id.clone(),
            total_handoffs: ctx.handoff_count(),
            agents_used: ctx.agents_used(),
            handoff_errors: ctx.handoff_errors().len(),
            conversation_duration_secs: ctx.conversation_duration_secs(),
            cleanup: CleanupStatus::Skipped,
        });
        info!(
            call_id = %call_id,
            total_handoffs = summary.total_handoffs,
            agents_used = ?summary.agents_used,
            handoff_errors = summary.handoff_errors,
            duration_secs = ?summary.conversation_duration_secs,
            "Conversation summary"
        );

        if let Err(e) = runtime.interrupt().await {
            warn!(call_id = %call_id, error = %e, "Failed to interrupt speech");
        }
        let goodbye = self.orchestrator.options().goodbye_instructions.clone();
        if let Err(e) = runtime.generate_reply(Some(&goodbye), false).await {
            warn!(call_id = %call_id, error = %e, "Failed to say goodbye");
        }

        summary.cleanup = self.cleanup(&call_id).await;
        summary
    }

    async fn cleanup(&self, call_id: &str) -> CleanupStatus {
        let options = self.orchestrator.options();
        if call_id == options.mock_call_id {
            debug!(call_id = %call_id, "Offline call, skipping resource deletion");
            return CleanupStatus::Skipped;
        }

        let runtime = self.orchestrator.runtime();
        let result = match tokio::time::timeout(
            options.cleanup_timeout,
            runtime.delete_call_resource(call_id),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::RuntimeTimeout {
                operation: "delete_call_resource",
                timeout_ms: options.cleanup_timeout.as_millis() as u64,
            }),
        };

        match result {
            Ok(()) => {
                info!(call_id = %call_id, "Call resource deleted");
                CleanupStatus::Deleted
            }
            Err(e) => {
                warn!(call_id = %call_id, error_kind = e.kind(), error = %e, "Failed to delete call resource");
                CleanupStatus::Failed {
                    error_kind: e.kind().to_string(),
                    message: e.to_string(),
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Tools
    // ─────────────────────────────────────────────────────────────

    /// Run a parsed tool call against this instance
    pub async fn invoke(&mut self, call: ToolCall) -> ToolOutcome {
        match call {
            ToolCall::Handoff { target, payload } => {
                match self.request_handoff(&target, payload.into()) {
                    HandoffOutcome::Handoff { next, announcement } => {
                        ToolOutcome::Handoff { next, announcement }
                    }
                    HandoffOutcome::Reply { text } => ToolOutcome::Reply { text },
                }
            }
            call if !self.exposes(&call.name()) => {
                warn!(agent = %self.definition.id, tool = %call.name(), "Tool not available to this agent");
                ToolOutcome::Reply {
                    text: TOOL_UNAVAILABLE.to_string(),
                }
            }
            ToolCall::EndConversation => ToolOutcome::Ended {
                summary: self.end_conversation().await,
            },
            ToolCall::CurrentTime { timezone } => {
                let zone = timezone
                    .filter(|z| !z.trim().is_empty())
                    .unwrap_or_else(|| self.default_timezone());
                ToolOutcome::Output {
                    text: match time::current_time(&zone) {
                        Ok(now) => format!("The current time in {} is {}.", zone, now),
                        Err(e) => tool_error(&e),
                    },
                }
            }
            ToolCall::ConvertTime {
                time: at,
                from_timezone,
                to_timezone,
            } => ToolOutcome::Output {
                text: match time::convert_time(&at, &from_timezone, &to_timezone) {
                    Ok(converted) => {
                        format!("{} in {} is {} in {}.", at, from_timezone, converted, to_timezone)
                    }
                    Err(e) => tool_error(&e),
                },
            },
        }
    }

    /// Append a turn to the call's conversation history
    pub fn add_to_conversation_history(&self, role: &str, content: &str) {
        self.context.update(ContextUpdate::ConversationAppended(ConversationTurn {
            role: role.to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
        }));
    }

    fn default_timezone(&self) -> String {
        self.orchestrator.catalog().session().default_timezone.clone()
    }
}

fn tool_error(e: &Error) -> String {
    match e.suggestion() {
        Some(hint) => format!("{} {}", e, hint),
        None => e.to_string(),
    }
}

impl fmt::Debug for PersonaInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersonaInstance")
            .field("instance_id", &self.instance_id)
            .field("persona", &self.definition.id)
            .field("started_at", &self.started_at)
            .field("exited", &self.exited)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::builtin::{BOOKING_ID, STARTER_ID, SUPPORT_ID};
    use crate::persona::PersonaCatalog;
    use crate::runtime::{MockRuntime, RuntimeEvent, SessionRuntime};
    use crate::session::SessionStore;

    fn setup(call_id: &str) -> (Orchestrator, Arc<MockRuntime>, ContextHandle) {
        let runtime = Arc::new(MockRuntime::new(call_id));
        let orch = Orchestrator::builder(Arc::new(PersonaCatalog::builtin()), runtime.clone()).build();
        let context = SessionStore::new().open(call_id);
        (orch, runtime, context)
    }

    #[tokio::test]
    async fn test_enter_records_and_greets() {
        let (orch, runtime, context) = setup("mock_room");
        let mut starter = orch.spawn_entry(context.clone()).unwrap();
        starter.enter().await;

        context.read(|ctx| {
            assert_eq!(ctx.current_agent(), Some(STARTER_ID));
            assert_eq!(ctx.agent_entries().len(), 1);
            assert_eq!(ctx.memory_user_id(), Some("mock_room"));
        });
        assert_eq!(runtime.reply_count(), 1);
        assert!(starter.started_at().is_some());
    }

    #[tokio::test]
    async fn test_exit_only_once() {
        let (orch, _, context) = setup("mock_room");
        let mut starter = orch.spawn_entry(context.clone()).unwrap();
        starter.enter().await;

        assert!(starter.exit(ExitReason::Handoff));
        assert!(!starter.exit(ExitReason::Error));
        context.read(|ctx| {
            assert_eq!(ctx.agent_exits().len(), 1);
            assert_eq!(ctx.previous_agent(), Some(STARTER_ID));
            assert!(ctx.agent_exits()[0].duration_secs.is_some());
        });
    }

    #[test]
    fn test_exit_without_enter_has_no_duration() {
        let (orch, _, context) = setup("mock_room");
        let mut starter = orch.spawn_entry(context.clone()).unwrap();
        starter.exit(ExitReason::Error);
        context.read(|ctx| assert_eq!(ctx.agent_exits()[0].duration_secs, None));
    }

    #[tokio::test]
    async fn test_handoff_to_support() {
        let (orch, _, context) = setup("mock_room");
        let mut starter = orch.spawn_entry(context.clone()).unwrap();
        starter.enter().await;

        let outcome =
            starter.request_handoff(SUPPORT_ID, HandoffPayload::new().with("topic", "printer jam"));
        let (next, text) = outcome.into_parts();
        let next = next.unwrap();
        assert_eq!(next.id(), SUPPORT_ID);
        assert!(text.contains("printer jam"));
        assert!(next.context().same_context(&context));
        assert!(starter.has_exited());

        context.read(|ctx| {
            let record = ctx.last_handoff().unwrap();
            assert_eq!(record.source, STARTER_ID);
            assert_eq!(record.target, SUPPORT_ID);
            assert_eq!(record.reason, "technical_issue");
            assert_eq!(record.context.get("topic").map(String::as_str), Some("printer jam"));
        });
    }

    #[tokio::test]
    async fn test_rejected_handoff_changes_nothing() {
        let (orch, _, context) = setup("mock_room");
        let mut starter = orch.spawn_entry(context.clone()).unwrap();
        starter.enter().await;
        let before = context.snapshot();

        let (next, text) = starter.request_handoff("", HandoffPayload::new()).into_parts();
        assert!(next.is_none());
        assert_eq!(text, crate::orchestrator::TRANSFER_FALLBACK);
        assert!(!starter.has_exited());

        let after = context.snapshot();
        assert_eq!(after.agent_exits().len(), before.agent_exits().len());
        assert_eq!(after.handoff_count(), 0);
        assert!(after.handoff_errors().is_empty());
    }

    #[tokio::test]
    async fn test_failed_construction_resumes_current() {
        let (orch, _, context) = setup("mock_room");
        let mut starter = orch.spawn_entry(context.clone()).unwrap();
        starter.enter().await;

        // Booking needs an appointment topic
        let (next, _) = starter.request_handoff(BOOKING_ID, HandoffPayload::new()).into_parts();
        assert!(next.is_none());
        assert!(!starter.has_exited());

        context.read(|ctx| {
            assert_eq!(ctx.current_agent(), Some(STARTER_ID));
            assert_eq!(ctx.handoff_errors().len(), 1);
            assert_eq!(ctx.handoff_count(), 0);
            assert_eq!(ctx.agent_entries().len(), 2);
            assert_eq!(ctx.agent_exits().len(), 1);
        });
    }

    #[tokio::test]
    async fn test_end_conversation_order() {
        let (orch, runtime, context) = setup("mock_room");
        let mut starter = orch.spawn_entry(context.clone()).unwrap();
        starter.enter().await;
        runtime.clear();

        let summary = starter.end_conversation().await;
        assert_eq!(summary.cleanup, CleanupStatus::Skipped);
        assert_eq!(summary.agents_used, vec![STARTER_ID.to_string()]);
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
    }

    #[tokio::test]
    async fn test_cleanup_deletes_real_call() {
        let (orch, runtime, context) = setup("room-123");
        let mut starter = orch.spawn_entry(context).unwrap();
        starter.enter().await;

        let summary = starter.end_conversation().await;
        assert_eq!(summary.cleanup, CleanupStatus::Deleted);
        assert!(runtime.events().contains(&RuntimeEvent::DeleteRequested {
            call_id: runtime.call_id().to_string()
        }));
    }

    #[tokio::test]
    async fn test_unexposed_tool_is_polite() {
        let (orch, _, context) = setup("mock_room");
        let mut starter = orch.spawn_entry(context).unwrap();
        starter.enter().await;

        let outcome = starter.invoke(ToolCall::CurrentTime { timezone: None }).await;
        assert!(matches!(outcome, ToolOutcome::Reply { ref text } if text == TOOL_UNAVAILABLE));
    }

    #[test]
    fn test_conversation_history() {
        let (orch, _, context) = setup("mock_room");
        let starter = orch.spawn_entry(context.clone()).unwrap();
        starter.add_to_conversation_history("user", "hi");
        context.read(|ctx| assert_eq!(ctx.conversation_history().len(), 1));
    }
}
