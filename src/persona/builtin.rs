//! Built-in personas used when no agents document is configured.
//!
//! Tom answers every call and routes to Sarah (technical support) or James
//! (appointment booking); both specialists can send the caller back to Tom.

use super::types::{
    PersonaCapabilities, PersonaDefinition, PersonaKind, PersonaRole, VoiceIdentity,
};

pub const STARTER_ID: &str = "starter";
pub const SUPPORT_ID: &str = "support";
pub const BOOKING_ID: &str = "booking";

const STARTER_INSTRUCTIONS: &str = "You are a helpful voice AI assistant. The user is interacting with you via voice, even if you perceive the conversation as text.
Only speak in english. Greet the user by saying your name is Tom.
If the user wants to book an appointment call the tool call_booking_agent to connect to James the booking agent.
If the user has a technical issue call the tool call_support_agent to connect to Sarah the support agent.
Your responses are concise, to the point, and without any complex formatting or punctuation including emojis, asterisks, or other symbols.
You are curious, friendly, and have a sense of humor.";

const SUPPORT_INSTRUCTIONS: &str = "You are a support voice AI assistant, only speak english.
Greet the user by saying your name is Sarah.
The user has been transferred to you with the following technical issue: {topic}. Acknowledge this issue naturally when greeting the user and show that you understand their problem.
When the issue is resolved, ask the user if they want to talk to Tom again. If they do, call the tool call_starter_agent to transfer them back to Tom.
If not end the conversation with the tool end_conversation.
Your responses are concise, to the point, and without any complex formatting or punctuation including emojis, asterisks, or other symbols.";

const BOOKING_INSTRUCTIONS: &str = "You are a booking voice AI assistant, only speak english.
Greet the user by saying your name is James.
The topic of the booking is {appointment_topic}. Acknowledge this topic naturally when greeting the user.
It is currently {current_time} ({timezone}). Use get_current_time and convert_time when the user talks about other timezones.
When the booking was successful, ask the user if they want to talk to Tom again. If they do, call the tool call_starter_agent to transfer them back to Tom.
If not end the conversation with the tool end_conversation.
Your responses are concise, to the point, and without any complex formatting or punctuation including emojis, asterisks, or other symbols.";

/// The default catalog, entry persona first
pub fn builtin_personas() -> Vec<PersonaDefinition> {
    vec![
        PersonaDefinition {
            id: STARTER_ID.to_string(),
            name: "Tom".to_string(),
            role: PersonaRole::Entry,
            kind: PersonaKind::Generic,
            instructions: STARTER_INSTRUCTIONS.to_string(),
            voice: VoiceIdentity::cartesia("5ee9feff-1265-424a-9d7f-8e4d431a12c7"),
            allowed_targets: vec![SUPPORT_ID.to_string(), BOOKING_ID.to_string()],
            capabilities: PersonaCapabilities::default(),
        },
        PersonaDefinition {
            id: SUPPORT_ID.to_string(),
            name: "Sarah".to_string(),
            role: PersonaRole::Specialist,
            kind: PersonaKind::Support,
            instructions: SUPPORT_INSTRUCTIONS.to_string(),
            voice: VoiceIdentity::cartesia("9626c31c-bec5-4cca-baa8-f8ba9e84c8bc"),
            allowed_targets: vec![STARTER_ID.to_string()],
            capabilities: PersonaCapabilities::default(),
        },
        PersonaDefinition {
            id: BOOKING_ID.to_string(),
            name: "James".to_string(),
            role: PersonaRole::Specialist,
            kind: PersonaKind::Booking,
            instructions: BOOKING_INSTRUCTIONS.to_string(),
            voice: VoiceIdentity::cartesia("79f8b5fb-2cc8-479a-80df-29f7a7cf1a3e"),
            allowed_targets: vec![STARTER_ID.to_string()],
            capabilities: PersonaCapabilities::default(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_has_single_entry() {
        let personas = builtin_personas();
        let entries: Vec<_> = personas.iter().filter(|p| p.is_entry()).collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, STARTER_ID);
    }

    #[test]
    fn test_builtin_voices_are_distinct() {
        let voices: HashSet<_> = builtin_personas().into_iter().map(|p| p.voice.voice).collect();
        assert_eq!(voices.len(), 3);
    }

    #[test]
    fn test_builtin_routes() {
        let personas = builtin_personas();
        assert!(personas[0].can_hand_off_to(SUPPORT_ID));
        assert!(personas[0].can_hand_off_to(BOOKING_ID));
        assert!(personas[1].can_hand_off_to(STARTER_ID));
        assert!(!personas[1].can_hand_off_to(BOOKING_ID));
    }
}
