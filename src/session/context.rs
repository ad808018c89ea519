//! Call-scoped orchestration metadata.
//!
//! A [`SessionContext`] survives every persona switch within one call. It is
//! only ever changed through [`ContextUpdate`]s, each of which appends to an
//! audit sequence or bumps a counter. The only overwrites allowed are the
//! current/previous persona names and the one-time memory correlation key.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────
// Audit Records
// ─────────────────────────────────────────────────────────────────

/// Why a persona activation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Handoff,
    EndConversation,
    Error,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Handoff => "handoff",
            ExitReason::EndConversation => "end_conversation",
            ExitReason::Error => "error",
        }
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEntry {
    pub agent: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentExit {
    pub agent: String,
    pub timestamp: DateTime<Utc>,
    pub reason: ExitReason,
    /// Seconds the activation lasted; `None` when the entry time is unknown
    pub duration_secs: Option<f64>,
}

/// One successful transition between personas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffRecord {
    pub source: String,
    pub target: String,
    pub reason: String,
    pub context: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
    /// Set when this transition immediately reverses the previous one
    #[serde(default)]
    pub cycle_detected: bool,
}

/// A transition that was attempted, passed validation, and then failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffFailure {
    pub source: String,
    pub target: String,
    pub error_kind: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────
// Updates
// ─────────────────────────────────────────────────────────────────

/// A single merge step applied to a [`SessionContext`]
#[derive(Debug, Clone)]
pub enum ContextUpdate {
    Entered(AgentEntry),
    Exited(AgentExit),
    HandoffRecorded(HandoffRecord),
    HandoffFailed(HandoffFailure),
    /// Set the memory correlation key unless one is already present
    MemoryUserId(String),
    ConversationAppended(ConversationTurn),
}

// ─────────────────────────────────────────────────────────────────
// Session Context
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionContext {
    call_id: String,
    current_agent: Option<String>,
    previous_agent: Option<String>,
    agent_entries: Vec<AgentEntry>,
    agent_exits: Vec<AgentExit>,
    handoff_count: u32,
    handoff_history: Vec<HandoffRecord>,
    handoff_errors: Vec<HandoffFailure>,
    #[serde(rename = "mem0_user_id", skip_serializing_if = "Option::is_none")]
    memory_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    conversation_history: Vec<ConversationTurn>,
}

impl SessionContext {
    pub fn new(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            ..Default::default()
        }
    }

    /// Merge one update into the context
    pub fn apply(&mut self, update: ContextUpdate) {
        match update {
            ContextUpdate::Entered(entry) => {
                self.current_agent = Some(entry.agent.clone());
                self.agent_entries.push(entry);
            }
            ContextUpdate::Exited(exit) => {
                self.previous_agent = Some(exit.agent.clone());
                self.agent_exits.push(exit);
            }
            ContextUpdate::HandoffRecorded(record) => {
                self.handoff_count += 1;
                self.handoff_history.push(record);
            }
            ContextUpdate::HandoffFailed(failure) => {
                self.handoff_errors.push(failure);
            }
            ContextUpdate::MemoryUserId(id) => {
                if self.memory_user_id.is_none() {
                    self.memory_user_id = Some(id);
                }
            }
            ContextUpdate::ConversationAppended(turn) => {
                self.conversation_history.push(turn);
            }
        }
    }

    pub fn apply_all(&mut self, updates: impl IntoIterator<Item = ContextUpdate>) {
        for update in updates {
            self.apply(update);
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn current_agent(&self) -> Option<&str> {
        self.current_agent.as_deref()
    }

    pub fn previous_agent(&self) -> Option<&str> {
        self.previous_agent.as_deref()
    }

    pub fn agent_entries(&self) -> &[AgentEntry] {
        &self.agent_entries
    }

    pub fn agent_exits(&self) -> &[AgentExit] {
        &self.agent_exits
    }

    pub fn handoff_count(&self) -> u32 {
        self.handoff_count
    }

    pub fn handoff_history(&self) -> &[HandoffRecord] {
        &self.handoff_history
    }

    pub fn handoff_errors(&self) -> &[HandoffFailure] {
        &self.handoff_errors
    }

    pub fn last_handoff(&self) -> Option<&HandoffRecord> {
        self.handoff_history.last()
    }

    pub fn memory_user_id(&self) -> Option<&str> {
        self.memory_user_id.as_deref()
    }

    pub fn conversation_history(&self) -> &[ConversationTurn] {
        &self.conversation_history
    }

    /// Distinct persona ids in order of first activation
    pub fn agents_used(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for entry in &self.agent_entries {
            if !seen.contains(&entry.agent) {
                seen.push(entry.agent.clone());
            }
        }
        seen
    }

    /// Seconds from the first entry to the last exit
    pub fn conversation_duration_secs(&self) -> Option<f64> {
        let first = self.agent_entries.first()?;
        let last = self.agent_exits.last()?;
        Some((last.timestamp - first.timestamp).num_milliseconds() as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(agent: &str, at: DateTime<Utc>) -> ContextUpdate {
        ContextUpdate::Entered(AgentEntry {
            agent: agent.to_string(),
            timestamp: at,
        })
    }

    fn exit(agent: &str, at: DateTime<Utc>) -> ContextUpdate {
        ContextUpdate::Exited(AgentExit {
            agent: agent.to_string(),
            timestamp: at,
            reason: ExitReason::Handoff,
            duration_secs: None,
        })
    }

    fn handoff(source: &str, target: &str) -> ContextUpdate {
        ContextUpdate::HandoffRecorded(HandoffRecord {
            source: source.to_string(),
            target: target.to_string(),
            reason: "transfer".to_string(),
            context: BTreeMap::new(),
            timestamp: Utc::now(),
            cycle_detected: false,
        })
    }

    #[test]
    fn test_entry_sets_current_agent() {
        let mut ctx = SessionContext::new("room-1");
        ctx.apply(entry("Tom", Utc::now()));
        assert_eq!(ctx.current_agent(), Some("Tom"));
        assert_eq!(ctx.agent_entries().len(), 1);
        assert!(ctx.previous_agent().is_none());
    }

    #[test]
    fn test_exit_sets_previous_agent() {
        let mut ctx = SessionContext::new("room-1");
        let now = Utc::now();
        ctx.apply_all([entry("Tom", now), exit("Tom", now)]);
        assert_eq!(ctx.previous_agent(), Some("Tom"));
        assert_eq!(ctx.agent_exits()[0].reason, ExitReason::Handoff);
    }

    #[test]
    fn test_handoff_count_matches_history() {
        let mut ctx = SessionContext::new("room-1");
        ctx.apply_all([handoff("starter", "support"), handoff("support", "starter")]);
        assert_eq!(ctx.handoff_count() as usize, ctx.handoff_history().len());
        assert_eq!(ctx.last_handoff().unwrap().target, "starter");
    }

    #[test]
    fn test_memory_user_id_set_once() {
        let mut ctx = SessionContext::new("room-1");
        ctx.apply(ContextUpdate::MemoryUserId("user-42".into()));
        ctx.apply(ContextUpdate::MemoryUserId("someone-else".into()));
        assert_eq!(ctx.memory_user_id(), Some("user-42"));
    }

    #[test]
    fn test_agents_used_is_distinct_and_ordered() {
        let mut ctx = SessionContext::new("room-1");
        let now = Utc::now();
        ctx.apply_all([entry("Tom", now), entry("Sarah", now), entry("Tom", now)]);
        assert_eq!(ctx.agents_used(), vec!["Tom".to_string(), "Sarah".to_string()]);
    }

    #[test]
    fn test_conversation_duration() {
        let mut ctx = SessionContext::new("room-1");
        let start = Utc::now();
        assert!(ctx.conversation_duration_secs().is_none());

        ctx.apply_all([entry("Tom", start), exit("Tom", start + Duration::seconds(90))]);
        assert_eq!(ctx.conversation_duration_secs(), Some(90.0));
    }

    #[test]
    fn test_serializes_memory_key_under_wire_name() {
        let mut ctx = SessionContext::new("room-1");
        ctx.apply(ContextUpdate::MemoryUserId("user-42".into()));
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["mem0_user_id"], "user-42");
        assert_eq!(json["handoff_count"], 0);
    }
}
