//! Construction of persona instances.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::behavior::{behavior_for, handoff_tool};
use super::handoff::HandoffPayload;
use super::persona::PersonaInstance;
use super::Orchestrator;
use crate::error::{Error, Result};
use crate::persona::instructions::{render, user_name_line};
use crate::persona::PersonaDefinition;
use crate::session::ContextHandle;
use crate::tools::{time, ToolSpec};

/// Everything needed to build one activation of a persona
#[derive(Debug, Clone)]
pub struct PersonaRequest {
    pub definition: Arc<PersonaDefinition>,
    pub payload: HandoffPayload,
    pub context: ContextHandle,
}

/// Builds persona instances. Must not touch the session runtime.
pub trait PersonaFactory: Send + Sync {
    fn create(&self, orchestrator: &Orchestrator, request: PersonaRequest) -> Result<PersonaInstance>;
}

/// Builds instances from catalog definitions
#[derive(Debug, Default, Clone, Copy)]
pub struct CatalogFactory;

impl PersonaFactory for CatalogFactory {
    fn create(&self, orchestrator: &Orchestrator, request: PersonaRequest) -> Result<PersonaInstance> {
        let PersonaRequest {
            definition,
            payload,
            context,
        } = request;
        let behavior = behavior_for(definition.kind);

        let topic = payload.topic().map(str::to_string);
        if behavior.requires_topic() && topic.is_none() {
            return Err(Error::persona_construction(
                &definition.id,
                format!("'{}' is required", behavior.payload_key()),
            ));
        }

        let timezone = orchestrator.catalog().session().default_timezone.clone();
        let user_name = orchestrator
            .metadata()
            .user_name
            .clone()
            .filter(|n| !n.trim().is_empty());

        let mut values: BTreeMap<String, String> = payload.as_map().clone();
        if let Some(topic) = &topic {
            values.entry("topic".into()).or_insert_with(|| topic.clone());
            values
                .entry("appointment_topic".into())
                .or_insert_with(|| topic.clone());
        }
        values.insert("agent_name".into(), definition.name.clone());
        values.insert("current_time".into(), time::current_time(&timezone)?);
        values.insert("timezone".into(), timezone);
        if let Some(name) = &user_name {
            values.insert("user_name".into(), name.clone());
        }

        let mut instructions = render(&definition.id, &definition.instructions, &values)?;
        if definition.is_entry() {
            if let Some(name) = &user_name {
                instructions.push_str(&user_name_line(name));
            }
        }

        let tools = tools_for(orchestrator, &definition)?;
        debug!(
            agent = %definition.id,
            tools = tools.len(),
            "Persona instance constructed"
        );

        Ok(PersonaInstance::new(
            orchestrator.clone(),
            definition,
            instructions,
            tools,
            payload,
            context,
        ))
    }
}

/// Handoff tools for every legal target, then end_conversation, then extras
fn tools_for(orchestrator: &Orchestrator, definition: &PersonaDefinition) -> Result<Vec<ToolSpec>> {
    let mut tools = Vec::with_capacity(definition.allowed_targets.len() + 3);
    for target in &definition.allowed_targets {
        let target = orchestrator.catalog().require(target)?;
        tools.push(handoff_tool(&target));
    }
    tools.push(ToolSpec::end_conversation());
    tools.extend(behavior_for(definition.kind).extra_tools());
    Ok(tools)
}
