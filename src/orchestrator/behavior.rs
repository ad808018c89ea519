//! Per-kind persona behavior.
//!
//! Every persona shares the same lifecycle; what differs between a support
//! specialist, a booking specialist and a plain persona is the payload it
//! needs, how a transfer to it is announced and which extra tools it gets.

use std::fmt;

use crate::persona::{PersonaDefinition, PersonaKind};
use crate::tools::ToolSpec;

/// Reason recorded for a transfer back to the entry persona
pub const RETURN_REASON: &str = "return_to_starter";

pub trait PersonaBehavior: Send + Sync + fmt::Debug {
    fn kind(&self) -> PersonaKind;

    /// Handoff payload key this persona is constructed from
    fn payload_key(&self) -> &'static str;

    fn payload_description(&self) -> &'static str;

    /// Reason recorded on a handoff into this persona
    fn arrival_reason(&self) -> &'static str;

    /// Whether construction fails without a non-empty topic
    fn requires_topic(&self) -> bool {
        false
    }

    /// What the current persona says before handing over
    fn announcement(&self, name: &str, topic: Option<&str>) -> String;

    /// Description of the `call_<id>_agent` tool that reaches this persona
    fn tool_description(&self, name: &str) -> String;

    /// Tools beyond handoff and end_conversation
    fn extra_tools(&self) -> Vec<ToolSpec> {
        Vec::new()
    }
}

#[derive(Debug)]
struct GenericBehavior;

#[derive(Debug)]
struct SupportBehavior;

#[derive(Debug)]
struct BookingBehavior;

impl PersonaBehavior for GenericBehavior {
    fn kind(&self) -> PersonaKind {
        PersonaKind::Generic
    }

    fn payload_key(&self) -> &'static str {
        "topic"
    }

    fn payload_description(&self) -> &'static str {
        "What the user needs help with"
    }

    fn arrival_reason(&self) -> &'static str {
        "transfer"
    }

    fn announcement(&self, name: &str, topic: Option<&str>) -> String {
        match topic {
            Some(topic) => format!("Transferring you to {}. They'll help you with: {}.", name, topic),
            None => format!("Transferring you to {}.", name),
        }
    }

    fn tool_description(&self, name: &str) -> String {
        format!("Called when the user should talk to {}", name)
    }
}

impl PersonaBehavior for SupportBehavior {
    fn kind(&self) -> PersonaKind {
        PersonaKind::Support
    }

    fn payload_key(&self) -> &'static str {
        "topic"
    }

    fn payload_description(&self) -> &'static str {
        "The technical issue the user has"
    }

    fn arrival_reason(&self) -> &'static str {
        "technical_issue"
    }

    fn requires_topic(&self) -> bool {
        true
    }

    fn announcement(&self, name: &str, topic: Option<&str>) -> String {
        format!(
            "Transferring you to {}, our technical support specialist, who will help you with: {}.",
            name,
            topic.unwrap_or("your issue")
        )
    }

    fn tool_description(&self, name: &str) -> String {
        format!("Called when the user has a technical issue. Connects them to {}", name)
    }
}

impl PersonaBehavior for BookingBehavior {
    fn kind(&self) -> PersonaKind {
        PersonaKind::Booking
    }

    fn payload_key(&self) -> &'static str {
        "appointment_topic"
    }

    fn payload_description(&self) -> &'static str {
        "What the appointment is about"
    }

    fn arrival_reason(&self) -> &'static str {
        "appointment_booking"
    }

    fn requires_topic(&self) -> bool {
        true
    }

    fn announcement(&self, name: &str, topic: Option<&str>) -> String {
        format!(
            "Transferring you to {}, our booking specialist, who will help you schedule: {}.",
            name,
            topic.unwrap_or("your appointment")
        )
    }

    fn tool_description(&self, name: &str) -> String {
        format!("Called when the user wants to book an appointment. Connects them to {}", name)
    }

    fn extra_tools(&self) -> Vec<ToolSpec> {
        vec![ToolSpec::current_time(), ToolSpec::convert_time()]
    }
}

static GENERIC: GenericBehavior = GenericBehavior;
static SUPPORT: SupportBehavior = SupportBehavior;
static BOOKING: BookingBehavior = BookingBehavior;

pub fn behavior_for(kind: PersonaKind) -> &'static dyn PersonaBehavior {
    match kind {
        PersonaKind::Generic => &GENERIC,
        PersonaKind::Support => &SUPPORT,
        PersonaKind::Booking => &BOOKING,
    }
}

/// Reason recorded for a handoff into `target`
pub fn arrival_reason(target: &PersonaDefinition) -> &'static str {
    if target.is_entry() {
        RETURN_REASON
    } else {
        behavior_for(target.kind).arrival_reason()
    }
}

/// Transfer announcement for a handoff into `target`
pub fn announcement(target: &PersonaDefinition, topic: Option<&str>) -> String {
    if target.is_entry() {
        format!("Transferring you back to {}.", target.name)
    } else {
        behavior_for(target.kind).announcement(&target.name, topic)
    }
}

/// Handoff tool declaration for reaching `target`
pub fn handoff_tool(target: &PersonaDefinition) -> ToolSpec {
    if target.is_entry() {
        return ToolSpec::handoff(
            &target.id,
            format!("Called when the user wants to talk to {} again", target.name),
            None,
        );
    }
    let behavior = behavior_for(target.kind);
    ToolSpec::handoff(
        &target.id,
        behavior.tool_description(&target.name),
        Some((behavior.payload_key(), behavior.payload_description())),
    )
}
