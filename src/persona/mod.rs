//! Persona model: definitions, the catalog that validates them, and the
//! built-in defaults.

pub mod builtin;
pub mod catalog;
pub mod instructions;
pub mod types;

pub use catalog::{AgentDocument, CatalogDocument, CatalogSource, PersonaCatalog};
pub use types::{
    PersonaCapabilities, PersonaDefinition, PersonaKind, PersonaRole, SessionSettings,
    VoiceIdentity,
};
