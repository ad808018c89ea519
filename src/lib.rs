//! Replaxy - multi-persona handoff orchestration for voice calls
//!
//! One call is served by one persona at a time. Personas hand the call to
//! each other through validated, logged transitions; the call-scoped
//! [`session::SessionContext`] carries continuity across them, and a failed
//! transfer always leaves the caller talking to someone.

pub mod call;
pub mod config;
pub mod error;
pub mod logging;
pub mod memory;
pub mod orchestrator;
pub mod persona;
pub mod runtime;
pub mod session;
pub mod tools;
pub mod version;

pub use call::{CallSession, ToolResult};
pub use error::{Error, ErrorCode, Result};
