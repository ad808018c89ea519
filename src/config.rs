//! Configuration system for replaxy
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (REPLAXY_* prefix, plus MEM0_API_KEY and AGENTS_CONFIG_PATH)
//! 3. Configuration file (TOML)
//! 4. Default values
//!
//! The persona catalog itself lives in a separate agents document, see
//! [`crate::persona::catalog`]. This file only points at it.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where the agents document lives
    pub agents: AgentsSettings,

    /// Conversation memory service
    pub memory: MemorySettings,

    /// Call lifecycle settings
    pub call: CallSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsSettings {
    /// Path to the agents document (built-in personas when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// Memory service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    /// Master switch; the bridge also needs an API key to do anything
    pub enabled: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    pub base_url: String,

    /// Upper bound for each add/search request
    pub timeout_ms: u64,
}

/// Call lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CallSettings {
    /// Call id whose resource is never deleted (offline and test calls)
    pub mock_call_id: String,

    /// Upper bound for deleting the call resource at the end of a call
    pub cleanup_timeout_ms: u64,

    /// Instruction override used for the closing reply
    pub goodbye_instructions: String,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Maximum log file size in MB before rotation
    pub max_file_size_mb: u64,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: "https://api.mem0.ai".to_string(),
            timeout_ms: 3000,
        }
    }
}

impl MemorySettings {
    /// Memory is only wired up when switched on and a key is present
    pub fn is_active(&self) -> bool {
        self.enabled && self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for CallSettings {
    fn default() -> Self {
        Self {
            mock_call_id: "mock_room".to_string(),
            cleanup_timeout_ms: 5000,
            goodbye_instructions: "say goodbye".to_string(),
        }
    }
}

impl CallSettings {
    pub fn cleanup_timeout(&self) -> Duration {
        Duration::from_millis(self.cleanup_timeout_ms)
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_file_size_mb: 100,
            max_files: 5,
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = match Self::find_config_file(config_path)? {
            Some(path) => {
                debug!(path = %path.display(), "Loading configuration file");
                let config = Self::from_file(&path)?;
                info!(path = %path.display(), "Configuration loaded from file");
                config
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.expand_paths();
        config.validate()?;

        Ok(config)
    }

    /// Parse a configuration file without applying overrides
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse {
            message: format!("{}: {}", path.display(), e.message()),
            source: Some(e),
        })
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::config_not_found(path));
        }

        let search_paths = [
            Some(PathBuf::from("replaxy.toml")),
            Some(PathBuf::from("config").join("replaxy.toml")),
            dirs::config_dir().map(|p| p.join("replaxy").join("config.toml")),
            dirs::home_dir().map(|p| p.join(".replaxy").join("config.toml")),
        ];

        for path in search_paths.iter().flatten() {
            if path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply overrides from an environment-like lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |val: &str| val.to_lowercase() == "true" || val == "1";

        // Agents document
        if let Some(val) = lookup("REPLAXY_AGENTS_CONFIG").or_else(|| lookup("AGENTS_CONFIG_PATH")) {
            self.agents.file = Some(val);
        }

        // Memory settings
        if let Some(val) = lookup("REPLAXY_MEMORY_ENABLED") {
            self.memory.enabled = flag(&val);
        }
        if let Some(val) = lookup("REPLAXY_MEM0_API_KEY").or_else(|| lookup("MEM0_API_KEY")) {
            self.memory.api_key = Some(val);
        }
        if let Some(val) = lookup("REPLAXY_MEMORY_URL") {
            self.memory.base_url = val;
        }
        if let Some(n) = lookup("REPLAXY_MEMORY_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.memory.timeout_ms = n;
        }

        // Call settings
        if let Some(val) = lookup("REPLAXY_MOCK_CALL_ID") {
            self.call.mock_call_id = val;
        }
        if let Some(n) = lookup("REPLAXY_CLEANUP_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.call.cleanup_timeout_ms = n;
        }

        // Logging settings
        if let Some(val) = lookup("REPLAXY_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = lookup("REPLAXY_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Some(val) = lookup("REPLAXY_LOG_JSON") {
            self.logging.json_format = flag(&val);
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        if let Some(ref file) = self.agents.file {
            self.agents.file = Some(expand_path(file));
        }
        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        if self.memory.timeout_ms == 0 {
            return Err(Error::config_field_invalid(
                "memory.timeout_ms",
                "memory.timeout_ms must be greater than 0",
            ));
        }

        match url::Url::parse(&self.memory.base_url) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
            Ok(_) => {
                return Err(Error::config_field_invalid(
                    "memory.base_url",
                    "memory.base_url must start with http:// or https://",
                ))
            }
            Err(e) => {
                return Err(Error::config_field_invalid(
                    "memory.base_url",
                    format!("Invalid memory.base_url '{}': {}", self.memory.base_url, e),
                ))
            }
        }

        if self.call.cleanup_timeout_ms == 0 {
            return Err(Error::config_field_invalid(
                "call.cleanup_timeout_ms",
                "call.cleanup_timeout_ms must be greater than 0",
            ));
        }
        if self.call.mock_call_id.trim().is_empty() {
            return Err(Error::config_field_invalid(
                "call.mock_call_id",
                "call.mock_call_id cannot be empty",
            ));
        }

        Ok(())
    }

    /// Agents document path, if one is configured
    pub fn agents_file(&self) -> Option<PathBuf> {
        self.agents.file.as_ref().map(PathBuf::from)
    }
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".replaxy")
                .join("config.toml")
        });

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    Ok(config_path)
}

/// Generate default configuration content with comments
pub fn generate_default_config() -> String {
    r#"# replaxy configuration

[agents]
# Agents document describing personas and the handoff graph.
# Built-in personas are used when unset, missing or invalid.
# file = "config/agents.toml"

[memory]
# Conversation memory bridge. Also requires an API key
# (MEM0_API_KEY in the environment works too).
enabled = true
# api_key = "m0-..."
base_url = "https://api.mem0.ai"

# Upper bound for each memory request in milliseconds
timeout_ms = 3000

[call]
# Call id that is never deleted at the end of a call
mock_call_id = "mock_room"

# Upper bound for deleting the call resource in milliseconds
cleanup_timeout_ms = 5000

# Instruction override for the closing reply
goodbye_instructions = "say goodbye"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.replaxy/logs/replaxy.log"

# Rotated log files to keep
max_files = 5
max_file_size_mb = 100

# JSON formatted output
json_format = false
"#
    .to_string()
}
