//! Session context shared by every persona of a call.

pub mod context;
pub mod store;

pub use context::{
    AgentEntry, AgentExit, ContextUpdate, ConversationTurn, ExitReason, HandoffFailure,
    HandoffRecord, SessionContext,
};
pub use store::{ContextHandle, ContextScope, SessionStore};
