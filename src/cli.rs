//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface and the line syntax of the console call.

use clap::{Parser, Subcommand};
use serde_json::Value;

/// Replaxy - multi-persona voice call orchestration
///
/// Runs a call in which a starter persona routes the caller to specialists
/// and back, either offline on the console or against a host voice session.
#[derive(Parser, Debug)]
#[command(name = "replaxy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an offline call on the console
    Run {
        /// Path to configuration file
        #[arg(short, long, env = "REPLAXY_CONFIG")]
        config: Option<String>,

        /// Agents document (overrides the configured one)
        #[arg(short, long)]
        agents: Option<String>,

        /// Call id (defaults to the configured mock call id)
        #[arg(long)]
        call_id: Option<String>,

        /// Stable id of the caller, used as the memory key
        #[arg(long)]
        user_id: Option<String>,

        /// Caller's name, passed to the starter persona
        #[arg(long)]
        user_name: Option<String>,
    },

    /// Inspect the persona catalog
    Agents {
        #[command(subcommand)]
        subcommand: AgentsSubcommand,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Display version and build information
    Version,
}

/// Persona catalog subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum AgentsSubcommand {
    /// List the personas of the resolved catalog
    List {
        #[arg(short, long)]
        config: Option<String>,

        #[arg(short, long)]
        agents: Option<String>,
    },

    /// Show one persona in detail
    Show {
        /// Persona id
        id: String,

        #[arg(short, long)]
        config: Option<String>,

        #[arg(short, long)]
        agents: Option<String>,
    },

    /// Validate an agents document without falling back to built-ins
    Validate {
        #[arg(short, long)]
        config: Option<String>,

        #[arg(short, long)]
        agents: Option<String>,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}

// ─────────────────────────────────────────────────────────────────
// Console Input
// ─────────────────────────────────────────────────────────────────

pub const CONSOLE_HELP: &str = "Type to talk to the active agent. Commands:
  /tools                  list the active agent's tools
  /call <tool> [json]     invoke a tool, e.g. /call call_support_agent {\"topic\": \"wifi\"}
  /context                print the session context
  /end                    end the conversation through the agent
  /quit                   hang up";

/// One line typed into the console call
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    Empty,
    Say(String),
    Tools,
    Call { name: String, args: Value },
    Context,
    End,
    Quit,
}

impl ConsoleInput {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(ConsoleInput::Empty);
        }
        let Some(command) = line.strip_prefix('/') else {
            return Ok(ConsoleInput::Say(line.to_string()));
        };

        let (verb, rest) = match command.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (command, ""),
        };

        match verb {
            "tools" => Ok(ConsoleInput::Tools),
            "context" => Ok(ConsoleInput::Context),
            "end" => Ok(ConsoleInput::End),
            "quit" | "exit" => Ok(ConsoleInput::Quit),
            "call" => {
                let (name, args) = match rest.split_once(char::is_whitespace) {
                    Some((name, args)) => (name, args.trim()),
                    None => (rest, ""),
                };
                if name.is_empty() {
                    return Err("usage: /call <tool> [json-args]".to_string());
                }
                let args = if args.is_empty() {
                    Value::Null
                } else {
                    serde_json::from_str(args).map_err(|e| format!("invalid JSON arguments: {}", e))?
                };
                Ok(ConsoleInput::Call {
                    name: name.to_string(),
                    args,
                })
            }
            other => Err(format!("unknown command '/{}'\n{}", other, CONSOLE_HELP)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_command() {
        let cli = Cli::parse_from(["replaxy", "run"]);
        match cli.command {
            Commands::Run {
                config,
                agents,
                call_id,
                ..
            } => {
                assert!(config.is_none());
                assert!(agents.is_none());
                assert!(call_id.is_none());
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_with_caller() {
        let cli = Cli::parse_from([
            "replaxy",
            "run",
            "--agents",
            "agents.toml",
            "--user-id",
            "u-1",
            "--user-name",
            "Dana",
        ]);
        match cli.command {
            Commands::Run {
                agents,
                user_id,
                user_name,
                ..
            } => {
                assert_eq!(agents, Some("agents.toml".to_string()));
                assert_eq!(user_id, Some("u-1".to_string()));
                assert_eq!(user_name, Some("Dana".to_string()));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_agents_show() {
        let cli = Cli::parse_from(["replaxy", "agents", "show", "support"]);
        match cli.command {
            Commands::Agents {
                subcommand: AgentsSubcommand::Show { id, .. },
            } => assert_eq!(id, "support"),
            _ => panic!("Expected Agents Show command"),
        }
    }

    #[test]
    fn test_verbose_flags() {
        let cli = Cli::parse_from(["replaxy", "-vv", "version"]);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_quiet_flag() {
        let cli = Cli::parse_from(["replaxy", "-q", "version"]);
        assert!(cli.quiet);
    }

    #[test]
    fn test_console_input() {
        assert_eq!(ConsoleInput::parse("  ").unwrap(), ConsoleInput::Empty);
        assert_eq!(
            ConsoleInput::parse("my printer is jammed").unwrap(),
            ConsoleInput::Say("my printer is jammed".into())
        );
        assert_eq!(ConsoleInput::parse("/tools").unwrap(), ConsoleInput::Tools);
        assert_eq!(ConsoleInput::parse("/quit").unwrap(), ConsoleInput::Quit);
        assert_eq!(
            ConsoleInput::parse("/call call_support_agent {\"topic\": \"wifi\"}").unwrap(),
            ConsoleInput::Call {
                name: "call_support_agent".into(),
                args: json!({"topic": "wifi"})
            }
        );
        assert_eq!(
            ConsoleInput::parse("/call end_conversation").unwrap(),
            ConsoleInput::Call {
                name: "end_conversation".into(),
                args: Value::Null
            }
        );
    }

    #[test]
    fn test_console_input_errors() {
        assert!(ConsoleInput::parse("/call").is_err());
        assert!(ConsoleInput::parse("/call x {oops").is_err());
        assert!(ConsoleInput::parse("/dance").is_err());
    }
}
