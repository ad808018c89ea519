//! Persona catalog: which personas exist, which one answers the call, and
//! where each may transfer to.
//!
//! A catalog comes either from an agents document (TOML) or from the
//! built-in personas. A document that fails validation is rejected as a
//! whole; [`PersonaCatalog::load_or_default`] then falls back to the
//! built-ins rather than applying part of it.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::builtin::builtin_personas;
use super::instructions;
use super::types::{
    PersonaCapabilities, PersonaDefinition, PersonaKind, PersonaRole, SessionSettings,
    VoiceIdentity,
};
use crate::error::{Error, Result};

// ─────────────────────────────────────────────────────────────────
// Agents Document
// ─────────────────────────────────────────────────────────────────

/// Top level of an agents document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogDocument {
    pub session: SessionSettings,
    pub agents: Vec<AgentDocument>,
}

/// One `[[agents]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDocument {
    #[serde(default)]
    pub id: String,

    /// Spoken name; defaults to the id
    #[serde(default)]
    pub name: String,

    #[serde(default = "default_role")]
    pub role: PersonaRole,

    #[serde(default)]
    pub instructions: String,

    /// Voice; defaults to the session voice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts: Option<VoiceIdentity>,

    /// Omitted: entry reaches every specialist, specialists reach the entry.
    /// An explicit empty list allows no transfers at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handoff_to: Option<Vec<String>>,

    #[serde(default)]
    pub agent_type: PersonaKind,

    #[serde(default = "enabled")]
    pub memory_enabled: bool,

    #[serde(default = "enabled")]
    pub mcp_enabled: bool,
}

fn default_role() -> PersonaRole {
    PersonaRole::Specialist
}

fn enabled() -> bool {
    true
}

impl CatalogDocument {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::catalog_invalid(e.message().to_string()))
    }

    /// Check every rule; the first violation rejects the document
    pub fn validate(&self) -> Result<()> {
        if self.agents.is_empty() {
            return Err(Error::catalog_invalid("config must define at least one agent"));
        }

        let entries = self
            .agents
            .iter()
            .filter(|a| a.role == PersonaRole::Entry)
            .count();
        if entries != 1 {
            return Err(Error::catalog_invalid(format!(
                "config must have exactly one entry agent (role = \"entry\"), found {}",
                entries
            )));
        }

        let mut ids = HashSet::new();
        for agent in &self.agents {
            if agent.id.trim().is_empty() {
                return Err(Error::catalog_invalid("each agent must have an id"));
            }
            if !ids.insert(agent.id.as_str()) {
                return Err(Error::catalog_invalid(format!("duplicate agent id: {}", agent.id)));
            }
        }

        for agent in &self.agents {
            for target in agent.handoff_to.iter().flatten() {
                if !ids.contains(target.as_str()) {
                    return Err(Error::catalog_invalid(format!(
                        "agent {} handoff_to references unknown agent id: {}",
                        agent.id, target
                    )));
                }
                if *target == agent.id {
                    return Err(Error::catalog_invalid(format!(
                        "agent {} lists itself in handoff_to",
                        agent.id
                    )));
                }
            }
        }

        for agent in self.agents.iter().filter(|a| a.role == PersonaRole::Entry) {
            if let Some(name) = instructions::referenced(&agent.instructions)
                .into_iter()
                .find(|name| instructions::CALL_START_UNAVAILABLE.contains(name))
            {
                return Err(Error::catalog_invalid(format!(
                    "entry agent {} instructions reference {{{}}}, which has no value when a call starts",
                    agent.id, name
                )));
            }
        }

        if self.session.default_timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(Error::catalog_invalid(format!(
                "session.default_timezone is not a known timezone: {}",
                self.session.default_timezone
            )));
        }

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────
// Catalog
// ─────────────────────────────────────────────────────────────────

/// Where a catalog's personas came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    BuiltIn,
    File(PathBuf),
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogSource::BuiltIn => f.write_str("built-in defaults"),
            CatalogSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Validated set of personas
#[derive(Debug, Clone)]
pub struct PersonaCatalog {
    personas: Vec<Arc<PersonaDefinition>>,
    entry: usize,
    session: SessionSettings,
    source: CatalogSource,
}

impl PersonaCatalog {
    /// Catalog of the hardcoded default personas
    pub fn builtin() -> Self {
        let personas: Vec<Arc<PersonaDefinition>> =
            builtin_personas().into_iter().map(Arc::new).collect();
        let entry = personas.iter().position(|p| p.is_entry()).unwrap_or(0);
        Self {
            personas,
            entry,
            session: SessionSettings::default(),
            source: CatalogSource::BuiltIn,
        }
    }

    /// Build a catalog from a parsed document
    pub fn from_document(document: CatalogDocument, source: CatalogSource) -> Result<Self> {
        document.validate()?;

        let entry_id = document
            .agents
            .iter()
            .find(|a| a.role == PersonaRole::Entry)
            .map(|a| a.id.clone())
            .ok_or_else(|| Error::catalog_invalid("no entry agent"))?;
        let specialist_ids: Vec<String> = document
            .agents
            .iter()
            .filter(|a| a.role == PersonaRole::Specialist)
            .map(|a| a.id.clone())
            .collect();

        let session = document.session;
        let personas: Vec<Arc<PersonaDefinition>> = document
            .agents
            .into_iter()
            .map(|agent| {
                let allowed_targets = match agent.handoff_to {
                    Some(targets) => targets,
                    None if agent.role == PersonaRole::Entry => specialist_ids.clone(),
                    None => vec![entry_id.clone()],
                };
                let voice = match agent.tts {
                    Some(tts) if !tts.voice.trim().is_empty() => tts,
                    Some(tts) => VoiceIdentity::new(tts.model, session.default_tts.voice.clone()),
                    None => session.default_tts.clone(),
                };
                let name = if agent.name.trim().is_empty() {
                    agent.id.clone()
                } else {
                    agent.name
                };

                Arc::new(PersonaDefinition {
                    id: agent.id,
                    name,
                    role: agent.role,
                    kind: agent.agent_type,
                    instructions: agent.instructions,
                    voice,
                    allowed_targets,
                    capabilities: PersonaCapabilities {
                        memory: agent.memory_enabled,
                        tools: agent.mcp_enabled,
                    },
                })
            })
            .collect();

        let entry = personas
            .iter()
            .position(|p| p.id == entry_id)
            .ok_or_else(|| Error::catalog_invalid("no entry agent"))?;

        Ok(Self {
            personas,
            entry,
            session,
            source,
        })
    }

    /// Load and validate an agents document
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let document = CatalogDocument::parse(&content)?;
        let catalog = Self::from_document(document, CatalogSource::File(path.to_path_buf()))?;
        info!(
            path = %path.display(),
            agents = catalog.len(),
            "Loaded agents configuration"
        );
        Ok(catalog)
    }

    /// Load an agents document, falling back to the built-in personas
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            debug!("No agents configuration set, using built-in personas");
            return Self::builtin();
        };

        if !path.exists() {
            debug!(path = %path.display(), "Agents configuration not found, using built-in personas");
            return Self::builtin();
        }

        match Self::load(path) {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Invalid agents configuration, using built-in personas"
                );
                Self::builtin()
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<PersonaDefinition>> {
        self.personas.iter().find(|p| p.id == id).cloned()
    }

    pub fn require(&self, id: &str) -> Result<Arc<PersonaDefinition>> {
        self.get(id).ok_or_else(|| Error::PersonaNotFound { id: id.to_string() })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.personas.iter().any(|p| p.id == id)
    }

    pub fn entry(&self) -> Arc<PersonaDefinition> {
        Arc::clone(&self.personas[self.entry])
    }

    pub fn personas(&self) -> &[Arc<PersonaDefinition>] {
        &self.personas
    }

    pub fn session(&self) -> &SessionSettings {
        &self.session
    }

    pub fn source(&self) -> &CatalogSource {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

impl Default for PersonaCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
