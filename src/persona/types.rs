//! Core types for the persona model.
//!
//! A persona is one state of the call's handoff state machine: a named
//! behavior configuration with its own voice, instructions and legal
//! transfer targets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default speech synthesis model for every persona
pub const DEFAULT_TTS_MODEL: &str = "cartesia/sonic-3";

// ─────────────────────────────────────────────────────────────────
// Role and Kind
// ─────────────────────────────────────────────────────────────────

/// Position of a persona in the handoff graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonaRole {
    /// Active at call start; exactly one per catalog
    #[serde(alias = "starter")]
    Entry,
    Specialist,
}

impl PersonaRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonaRole::Entry => "entry",
            PersonaRole::Specialist => "specialist",
        }
    }
}

impl fmt::Display for PersonaRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behavior variant a persona is built from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonaKind {
    #[default]
    Generic,
    Support,
    Booking,
}

impl PersonaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonaKind::Generic => "generic",
            PersonaKind::Support => "support",
            PersonaKind::Booking => "booking",
        }
    }
}

impl fmt::Display for PersonaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersonaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "generic" => Ok(PersonaKind::Generic),
            "support" => Ok(PersonaKind::Support),
            "booking" => Ok(PersonaKind::Booking),
            other => Err(format!(
                "Unknown agent_type '{}'. Expected one of: generic, support, booking",
                other
            )),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Voice and Capabilities
// ─────────────────────────────────────────────────────────────────

/// Speech synthesis voice; distinguishes personas audibly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceIdentity {
    #[serde(default = "default_tts_model")]
    pub model: String,
    #[serde(default)]
    pub voice: String,
}

fn default_tts_model() -> String {
    DEFAULT_TTS_MODEL.to_string()
}

impl VoiceIdentity {
    pub fn new(model: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            voice: voice.into(),
        }
    }

    pub fn cartesia(voice: impl Into<String>) -> Self {
        Self::new(DEFAULT_TTS_MODEL, voice)
    }
}

impl fmt::Display for VoiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.model, self.voice)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaCapabilities {
    /// Uses the conversation memory bridge
    pub memory: bool,
    /// May call external tool integrations
    pub tools: bool,
}

impl Default for PersonaCapabilities {
    fn default() -> Self {
        Self {
            memory: true,
            tools: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Persona Definition
// ─────────────────────────────────────────────────────────────────

/// Static description of a persona, shared by all of its activations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaDefinition {
    pub id: String,
    pub name: String,
    pub role: PersonaRole,
    pub kind: PersonaKind,
    /// Instruction template, see [`crate::persona::instructions`]
    pub instructions: String,
    pub voice: VoiceIdentity,
    /// Ordered persona ids this persona may hand control to
    pub allowed_targets: Vec<String>,
    pub capabilities: PersonaCapabilities,
}

impl PersonaDefinition {
    pub fn is_entry(&self) -> bool {
        self.role == PersonaRole::Entry
    }

    pub fn can_hand_off_to(&self, target_id: &str) -> bool {
        self.allowed_targets.iter().any(|t| t == target_id)
    }
}

// ─────────────────────────────────────────────────────────────────
// Session Settings
// ─────────────────────────────────────────────────────────────────

/// Call-wide model and integration settings from the agents document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub llm_model: String,
    pub stt_model: String,
    pub stt_language: String,
    pub default_tts: VoiceIdentity,
    /// IANA zone used by the time tools when none is given
    pub default_timezone: String,
    pub mcp_enabled: bool,
    pub memory_enabled: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            llm_model: "openai/gpt-4.1-mini".to_string(),
            stt_model: "assemblyai/universal-streaming".to_string(),
            stt_language: "en".to_string(),
            default_tts: VoiceIdentity::cartesia("87286a8d-7ea7-4235-a41a-dd9fa6630feb"),
            default_timezone: "UTC".to_string(),
            mcp_enabled: true,
            memory_enabled: true,
        }
    }
}
