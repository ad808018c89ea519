//! Replaxy - multi-persona voice call orchestration
//!
//! Entry point for the `replaxy` binary: catalog and configuration tooling,
//! and an offline console call that drives the handoff state machine.

mod cli;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use replaxy::config::{self, AppConfig};
use replaxy::error::{Error, Result};
use replaxy::logging;
use replaxy::memory::MemoryBridge;
use replaxy::orchestrator::{CallMetadata, Orchestrator, OrchestratorOptions};
use replaxy::persona::PersonaCatalog;
use replaxy::runtime::ConsoleRuntime;
use replaxy::session::SessionStore;
use replaxy::version;
use replaxy::{CallSession, ToolResult};

use crate::cli::{AgentsSubcommand, Cli, Commands, ConfigSubcommand, ConsoleInput, CONSOLE_HELP};

/// Caller details for a console call
struct RunOptions {
    agents: Option<String>,
    call_id: Option<String>,
    metadata: CallMetadata,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();

    let (config_path, options) = match cli.command {
        Commands::Version => {
            version::print_version();
            return Ok(());
        }
        Commands::Config { subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            return handle_config_command(subcommand);
        }
        Commands::Agents { subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            return handle_agents_command(subcommand);
        }
        Commands::Run {
            config,
            agents,
            call_id,
            user_id,
            user_name,
        } => (
            config,
            RunOptions {
                agents,
                call_id,
                metadata: CallMetadata { user_id, user_name },
            },
        ),
    };

    let config = load_or_exit(config_path.as_deref());

    // The guards must be kept alive for the lifetime of the program
    let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

    let build = version::build_info();
    info!(
        version = %build.full_version(),
        target = %build.target,
        profile = %build.profile,
        "Starting replaxy"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create async runtime: {}", e)))?;

    if let Err(e) = runtime.block_on(run_console_call(config, options)) {
        fail(e);
    }
    Ok(())
}

/// Print a coded error and exit with its category's exit code
fn fail(e: Error) -> ! {
    eprint!("{}", e.format_for_terminal());
    std::process::exit(e.exit_code());
}

fn load_or_exit(path: Option<&str>) -> AppConfig {
    AppConfig::load(path).unwrap_or_else(|e| fail(e))
}

fn resolve_catalog(config: &AppConfig, agents: Option<&str>) -> PersonaCatalog {
    let path = agents.map(PathBuf::from).or_else(|| config.agents_file());
    PersonaCatalog::load_or_default(path.as_deref())
}

// ─────────────────────────────────────────────────────────────────
// Console Call
// ─────────────────────────────────────────────────────────────────

async fn run_console_call(config: AppConfig, options: RunOptions) -> Result<()> {
    let catalog = Arc::new(resolve_catalog(&config, options.agents.as_deref()));
    let call_id = options
        .call_id
        .unwrap_or_else(|| config.call.mock_call_id.clone());

    let orchestrator = Orchestrator::builder(catalog, Arc::new(ConsoleRuntime::new(call_id)))
        .options(OrchestratorOptions::from(&config.call))
        .metadata(options.metadata)
        .build();
    let memory = MemoryBridge::from_settings(&config.memory);
    let store = Arc::new(SessionStore::new());

    println!("{}\n", CONSOLE_HELP);
    let mut call = CallSession::start(orchestrator, Some(store), memory).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while call.is_active() {
        print!("> ");
        std::io::stdout().flush()?;

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("End of input");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Unreadable console input, ending the call");
                break;
            }
        };

        match ConsoleInput::parse(&line) {
            Ok(ConsoleInput::Empty) => {}
            Ok(ConsoleInput::Say(text)) => call.user_turn(&text).await?,
            Ok(ConsoleInput::Tools) => {
                for tool in call.tools() {
                    println!("  {:<22} {}", tool.name, tool.description);
                }
            }
            Ok(ConsoleInput::Call { name, args }) => match call.invoke_tool(&name, &args).await? {
                ToolResult::Output(text) => println!("[{}] {}", name, text),
                ToolResult::Transferred { to, .. } => debug!(agent = %to, "Transferred"),
                ToolResult::Replied(_) | ToolResult::Ended(_) => {}
            },
            Ok(ConsoleInput::Context) => {
                println!("{}", serde_json::to_string_pretty(&call.snapshot())?);
            }
            Ok(ConsoleInput::End) => {
                call.invoke_tool(replaxy::tools::END_CONVERSATION, &serde_json::Value::Null)
                    .await?;
            }
            Ok(ConsoleInput::Quit) => break,
            Err(message) => eprintln!("{}", message),
        }
    }

    if call.is_active() {
        call.end().await;
    }
    if let Some(summary) = call.summary() {
        println!("{}", serde_json::to_string_pretty(summary)?);
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────
// Subcommands
// ─────────────────────────────────────────────────────────────────

/// Handle persona catalog subcommands
fn handle_agents_command(subcommand: AgentsSubcommand) -> Result<()> {
    match subcommand {
        AgentsSubcommand::List { config, agents } => {
            let cfg = load_or_exit(config.as_deref());
            let catalog = resolve_catalog(&cfg, agents.as_deref());
            println!("Personas ({}):", catalog.source());
            for persona in catalog.personas() {
                println!(
                    "  {:<12} {:<10} {:<11} {:<8} -> {}",
                    persona.id,
                    persona.name,
                    persona.role.as_str(),
                    persona.kind.as_str(),
                    persona.allowed_targets.join(", ")
                );
            }
        }
        AgentsSubcommand::Show { id, config, agents } => {
            let cfg = load_or_exit(config.as_deref());
            let catalog = resolve_catalog(&cfg, agents.as_deref());
            let persona = catalog.require(&id).unwrap_or_else(|e| fail(e));
            println!("id:           {}", persona.id);
            println!("name:         {}", persona.name);
            println!("role:         {}", persona.role);
            println!("type:         {}", persona.kind);
            println!("voice:        {}", persona.voice);
            println!("handoff_to:   {}", persona.allowed_targets.join(", "));
            println!("memory:       {}", persona.capabilities.memory);
            println!("tools:        {}", persona.capabilities.tools);
            println!("instructions:\n{}", persona.instructions);
        }
        AgentsSubcommand::Validate { config, agents } => {
            let cfg = load_or_exit(config.as_deref());
            let path = agents.map(PathBuf::from).or_else(|| cfg.agents_file());
            match path {
                Some(path) => match PersonaCatalog::load(&path) {
                    Ok(catalog) => {
                        println!(
                            "Agents configuration is valid: {} personas, entry '{}'.",
                            catalog.len(),
                            catalog.entry().id
                        );
                    }
                    Err(e) => fail(e),
                },
                None => println!("No agents configuration set, built-in personas are used."),
            }
        }
    }

    Ok(())
}

/// Handle configuration subcommands
fn handle_config_command(subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let mut cfg = load_or_exit(config.as_deref());
            if cfg.memory.api_key.is_some() {
                cfg.memory.api_key = Some("********".to_string());
            }
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let path = config::init_config(path.as_deref(), force).unwrap_or_else(|e| fail(e));
            println!("Configuration written to {}", path.display());
        }
        ConfigSubcommand::Validate { config } => {
            load_or_exit(config.as_deref());
            println!("Configuration is valid.");
        }
    }

    Ok(())
}
