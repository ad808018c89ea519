//! Handoff controller.
//!
//! Stateless: validation reads the catalog and the call's context, and every
//! outcome is written back to the context as an audit record.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use super::persona::PersonaInstance;
use crate::error::Error;
use crate::persona::{PersonaCatalog, PersonaDefinition};
use crate::session::{ContextHandle, ContextUpdate, HandoffFailure, HandoffRecord};

/// Spoken whenever a transfer cannot be completed
pub const TRANSFER_FALLBACK: &str =
    "I apologize, but I'm having trouble transferring you right now. Let me help you with that instead.";

// ─────────────────────────────────────────────────────────────────
// Payload
// ─────────────────────────────────────────────────────────────────

/// String arguments passed with a handoff request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandoffPayload(BTreeMap<String, String>);

impl HandoffPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// The transfer topic, from `topic` or `appointment_topic`
    pub fn topic(&self) -> Option<&str> {
        ["topic", "appointment_topic"]
            .iter()
            .filter_map(|key| self.get(key))
            .map(str::trim)
            .find(|value| !value.is_empty())
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, String>> for HandoffPayload {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

// ─────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────

/// Why a handoff request was refused before anything changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    EmptyTarget,
    UnknownTarget,
    /// Target exists but is not among the source's allowed targets
    Disallowed,
    /// The requesting instance is no longer active
    AlreadyExited,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::EmptyTarget => "empty_target",
            RejectionReason::UnknownTarget => "unknown_target",
            RejectionReason::Disallowed => "disallowed_target",
            RejectionReason::AlreadyExited => "already_exited",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ValidatedHandoff {
    pub target: Arc<PersonaDefinition>,
    /// The request reverses the call's most recent handoff
    pub cycle_detected: bool,
}

pub struct HandoffController;

impl HandoffController {
    /// Check a request from `source` to `target`. Cycles are flagged, never refused.
    pub fn validate(
        catalog: &PersonaCatalog,
        source: &PersonaDefinition,
        target: &str,
        context: &ContextHandle,
    ) -> std::result::Result<ValidatedHandoff, RejectionReason> {
        let target = target.trim();
        if target.is_empty() {
            return Err(RejectionReason::EmptyTarget);
        }

        let definition = catalog.get(target).ok_or(RejectionReason::UnknownTarget)?;
        if !source.can_hand_off_to(target) {
            return Err(RejectionReason::Disallowed);
        }

        let cycle_detected = context.read(|ctx| {
            ctx.last_handoff()
                .is_some_and(|last| last.target == source.id && last.source == target)
        });
        if cycle_detected {
            warn!(
                source = %source.id,
                target = %target,
                call_id = %context.call_id(),
                "Immediate handoff cycle detected, allowing it"
            );
        }

        Ok(ValidatedHandoff {
            target: definition,
            cycle_detected,
        })
    }

    pub fn record_success(
        context: &ContextHandle,
        source: &str,
        target: &str,
        reason: &str,
        payload: &HandoffPayload,
        cycle_detected: bool,
    ) -> HandoffRecord {
        let record = HandoffRecord {
            source: source.to_string(),
            target: target.to_string(),
            reason: reason.to_string(),
            context: payload.as_map().clone(),
            timestamp: Utc::now(),
            cycle_detected,
        };
        context.update(ContextUpdate::HandoffRecorded(record.clone()));
        record
    }

    pub fn record_failure(context: &ContextHandle, source: &str, target: &str, error: &Error) {
        context.update(ContextUpdate::HandoffFailed(HandoffFailure {
            source: source.to_string(),
            target: target.to_string(),
            error_kind: error.kind().to_string(),
            message: error.to_string(),
            timestamp: Utc::now(),
        }));
    }
}

// ─────────────────────────────────────────────────────────────────
// Outcome
// ─────────────────────────────────────────────────────────────────

/// Result of a handoff request
#[derive(Debug)]
pub enum HandoffOutcome {
    /// Install `next` as the active persona after speaking `announcement`
    Handoff {
        next: Box<PersonaInstance>,
        announcement: String,
    },
    /// No switch; the current persona speaks `text`
    Reply { text: String },
}

impl HandoffOutcome {
    pub fn fallback() -> Self {
        HandoffOutcome::Reply {
            text: TRANSFER_FALLBACK.to_string(),
        }
    }

    pub fn is_handoff(&self) -> bool {
        matches!(self, HandoffOutcome::Handoff { .. })
    }

    /// The two-part form: next persona if any, and the text to speak
    pub fn into_parts(self) -> (Option<PersonaInstance>, String) {
        match self {
            HandoffOutcome::Handoff { next, announcement } => (Some(*next), announcement),
            HandoffOutcome::Reply { text } => (None, text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::builtin::{BOOKING_ID, STARTER_ID, SUPPORT_ID};
    use crate::session::SessionStore;

    fn setup() -> (PersonaCatalog, ContextHandle) {
        let store = SessionStore::new();
        (PersonaCatalog::builtin(), store.open("room-1"))
    }

    #[test]
    fn test_payload_topic() {
        let payload = HandoffPayload::new().with("appointment_topic", " dentist ");
        assert_eq!(payload.topic(), Some("dentist"));
        assert_eq!(HandoffPayload::new().with("topic", "  ").topic(), None);
    }

    #[test]
    fn test_validate_rejections() {
        let (catalog, context) = setup();
        let starter = catalog.require(STARTER_ID).unwrap();
        let support = catalog.require(SUPPORT_ID).unwrap();

        let err = HandoffController::validate(&catalog, &starter, "  ", &context).unwrap_err();
        assert_eq!(err, RejectionReason::EmptyTarget);

        let err = HandoffController::validate(&catalog, &starter, "billing", &context).unwrap_err();
        assert_eq!(err, RejectionReason::UnknownTarget);

        let err = HandoffController::validate(&catalog, &support, BOOKING_ID, &context).unwrap_err();
        assert_eq!(err, RejectionReason::Disallowed);
    }

    #[test]
    fn test_cycle_is_flagged_not_blocked() {
        let (catalog, context) = setup();
        let support = catalog.require(SUPPORT_ID).unwrap();

        HandoffController::record_success(
            &context,
            STARTER_ID,
            SUPPORT_ID,
            "technical_issue",
            &HandoffPayload::new().with("topic", "wifi"),
            false,
        );

        let validated = HandoffController::validate(&catalog, &support, STARTER_ID, &context).unwrap();
        assert!(validated.cycle_detected);
        assert_eq!(validated.target.id, STARTER_ID);
    }

    #[test]
    fn test_record_failure() {
        let (_, context) = setup();
        let err = Error::persona_construction(SUPPORT_ID, "a topic is required");
        HandoffController::record_failure(&context, STARTER_ID, SUPPORT_ID, &err);

        context.read(|ctx| {
            assert_eq!(ctx.handoff_errors().len(), 1);
            assert_eq!(ctx.handoff_errors()[0].error_kind, "PersonaConstruction");
            assert_eq!(ctx.handoff_count(), 0);
        });
    }

    #[test]
    fn test_fallback_outcome() {
        let (next, text) = HandoffOutcome::fallback().into_parts();
        assert!(next.is_none());
        assert_eq!(text, TRANSFER_FALLBACK);
    }
}
