//! Error types for replaxy
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - A stable kind name recorded in the session audit trail
//! - Exit codes for CLI

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for replaxy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,
    Serialization = 204,

    // Persona catalog errors (3xx)
    CatalogInvalid = 300,
    PersonaNotFound = 301,
    PersonaConstruction = 302,

    // Tool invocation errors (4xx)
    ToolUnknown = 400,
    ToolArguments = 401,
    InvalidTimezone = 402,
    InvalidTime = 403,

    // Memory backend errors (5xx)
    MemoryTransport = 500,
    MemoryAuth = 501,
    MemoryTimeout = 502,

    // Session runtime errors (6xx)
    CallNotFound = 600,
    RuntimeTransport = 601,
    RuntimeTimeout = 602,
    RuntimeFailure = 603,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10,
            200..=299 => 20,
            300..=399 => 30,
            400..=499 => 40,
            500..=599 => 50,
            600..=699 => 60,
            900..=999 => 90,
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    /// Generic configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Persona Catalog Errors
    // ─────────────────────────────────────────────────────────────

    /// The agents document was rejected as a whole
    #[error("Invalid agents configuration: {message}")]
    CatalogInvalid { message: String },

    #[error("Persona not found: {id}")]
    PersonaNotFound { id: String },

    /// Building a persona instance for activation failed
    #[error("Failed to construct persona {persona}: {message}")]
    PersonaConstruction { persona: String, message: String },

    // ─────────────────────────────────────────────────────────────
    // Tool Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Unknown tool: {name}")]
    ToolUnknown { name: String },

    #[error("Invalid arguments for tool {tool}: {message}")]
    ToolArguments { tool: String, message: String },

    #[error("Unknown timezone: {zone}")]
    InvalidTimezone { zone: String },

    #[error("Invalid time '{value}': {message}")]
    InvalidTime { value: String, message: String },

    // ─────────────────────────────────────────────────────────────
    // Memory Backend Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Memory service request failed: {message}")]
    MemoryTransport { message: String },

    #[error("Memory service rejected credentials: {message}")]
    MemoryAuth { message: String },

    #[error("Memory {operation} timed out after {timeout_ms}ms")]
    MemoryTimeout { operation: &'static str, timeout_ms: u64 },

    // ─────────────────────────────────────────────────────────────
    // Session Runtime Errors
    // ─────────────────────────────────────────────────────────────

    /// The call resource does not exist or was already deleted
    #[error("Call resource not found or already deleted: {call_id}")]
    CallNotFound { call_id: String },

    #[error("{service} transport error: {message}")]
    Transport { service: String, message: String },

    #[error("Session runtime {operation} timed out after {timeout_ms}ms")]
    RuntimeTimeout { operation: &'static str, timeout_ms: u64 },

    #[error("Session runtime error: {0}")]
    Runtime(String),

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,
            Error::Config(_) => ErrorCode::ConfigValidation,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) | Error::Json(_) => ErrorCode::Serialization,

            Error::CatalogInvalid { .. } => ErrorCode::CatalogInvalid,
            Error::PersonaNotFound { .. } => ErrorCode::PersonaNotFound,
            Error::PersonaConstruction { .. } => ErrorCode::PersonaConstruction,

            Error::ToolUnknown { .. } => ErrorCode::ToolUnknown,
            Error::ToolArguments { .. } => ErrorCode::ToolArguments,
            Error::InvalidTimezone { .. } => ErrorCode::InvalidTimezone,
            Error::InvalidTime { .. } => ErrorCode::InvalidTime,

            Error::MemoryTransport { .. } => ErrorCode::MemoryTransport,
            Error::MemoryAuth { .. } => ErrorCode::MemoryAuth,
            Error::MemoryTimeout { .. } => ErrorCode::MemoryTimeout,

            Error::CallNotFound { .. } => ErrorCode::CallNotFound,
            Error::Transport { .. } => ErrorCode::RuntimeTransport,
            Error::RuntimeTimeout { .. } => ErrorCode::RuntimeTimeout,
            Error::Runtime(_) => ErrorCode::RuntimeFailure,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Stable variant name, recorded as `error_kind` in the handoff error log
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ConfigNotFound { .. } => "ConfigNotFound",
            Error::ConfigParse { .. } => "ConfigParse",
            Error::ConfigValidation { .. } | Error::Config(_) => "ConfigValidation",
            Error::IoRead { .. } => "IoRead",
            Error::IoWrite { .. } => "IoWrite",
            Error::Io(_) => "Io",
            Error::Toml(_) | Error::Json(_) => "Serialization",
            Error::CatalogInvalid { .. } => "CatalogInvalid",
            Error::PersonaNotFound { .. } => "PersonaNotFound",
            Error::PersonaConstruction { .. } => "PersonaConstruction",
            Error::ToolUnknown { .. } => "ToolUnknown",
            Error::ToolArguments { .. } => "ToolArguments",
            Error::InvalidTimezone { .. } => "InvalidTimezone",
            Error::InvalidTime { .. } => "InvalidTime",
            Error::MemoryTransport { .. } => "MemoryTransport",
            Error::MemoryAuth { .. } => "MemoryAuth",
            Error::MemoryTimeout { .. } => "MemoryTimeout",
            Error::CallNotFound { .. } => "NotFoundOrAlreadyDeleted",
            Error::Transport { .. } => "TransportError",
            Error::RuntimeTimeout { .. } => "RuntimeTimeout",
            Error::Runtime(_) => "RuntimeFailure",
            Error::Internal(_) => "Internal",
        }
    }

    /// Whether a live call can absorb this error and keep talking
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Internal(_))
    }

    /// Check if the error is fatal at startup (CLI should exit)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ConfigNotFound { .. }
                | Error::ConfigParse { .. }
                | Error::ConfigValidation { .. }
                | Error::Config(_)
                | Error::Internal(_)
        )
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'replaxy config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'replaxy config validate' to see details."
            ),
            Error::ConfigValidation { .. } => Some(
                "Review the configuration file and fix the invalid values."
            ),
            Error::CatalogInvalid { .. } => Some(
                "Run 'replaxy agents validate --agents <file>' and fix the reported agent entries."
            ),
            Error::PersonaNotFound { .. } => Some(
                "Run 'replaxy agents list' to see the personas that are defined."
            ),
            Error::InvalidTimezone { .. } => Some(
                "Use an IANA timezone name such as 'Europe/Berlin' or 'America/New_York'."
            ),
            Error::MemoryAuth { .. } => Some(
                "Check MEM0_API_KEY (or [memory] api_key) for the memory service."
            ),
            Error::MemoryTimeout { .. } => Some(
                "The memory service is slow to respond. Raise [memory] timeout_ms or disable memory."
            ),
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let mut output = format!("\x1b[31mError [{}]\x1b[0m: {}\n", self.code().as_str(), self);

        if let Some(hint) = self.suggestion() {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Error::ConfigNotFound {
            path: path.into(),
            source: None,
        }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: None,
        }
    }

    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn catalog_invalid(message: impl Into<String>) -> Self {
        Error::CatalogInvalid {
            message: message.into(),
        }
    }

    pub fn persona_construction(persona: impl Into<String>, message: impl Into<String>) -> Self {
        Error::PersonaConstruction {
            persona: persona.into(),
            message: message.into(),
        }
    }

    pub fn tool_arguments(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ToolArguments {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn transport(service: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Transport {
            service: service.into(),
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
