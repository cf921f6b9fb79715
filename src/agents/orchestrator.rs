//! Orchestrator: an actor whose capabilities are other agents.
//!
//! Agents are bound as [`AgentBlueprint`]s and called through
//! `<agent_call>` segments; each call runs a fresh task node.

use std::sync::Arc;

use super::actor::{Actor, ActorOutput};
use crate::llms::base_llm::CompletionEngine;
use crate::tools::agent_tools::AgentBlueprint;
use crate::utilities::config::ActorConfig;
use crate::utilities::errors::{AgentError, SchemaError};
use crate::utilities::prompts::ORCHESTRATOR_SYSTEM_PROMPT;

/// Tag the orchestrator uses for delegations.
pub const AGENT_CALL_TAG: &str = "agent_call";

/// Delegates a question to bound agents.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    actor: Actor,
}

impl Orchestrator {
    pub fn new(engine: Arc<dyn CompletionEngine>) -> Self {
        Self {
            actor: Actor::new(engine)
                .with_name("Orchestrator")
                .with_call_tag(AGENT_CALL_TAG)
                .with_loop_template(ORCHESTRATOR_SYSTEM_PROMPT),
        }
    }

    pub fn with_config(mut self, config: ActorConfig) -> Self {
        self.actor = self.actor.with_config(config);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.actor = self.actor.with_system_prompt(prompt);
        self
    }

    /// Make `blueprint` callable by name.
    pub fn bind_agent(&mut self, blueprint: AgentBlueprint) -> Result<(), SchemaError> {
        let name = blueprint.name.clone();
        self.actor.bind(blueprint.into_capability()?)?;
        log::debug!("Orchestrator bound agent '{}'", name);
        Ok(())
    }

    /// Names of the bound agents.
    pub fn agents(&self) -> String {
        self.actor.capabilities().names()
    }

    pub async fn invoke(&self, question: &str) -> Result<ActorOutput, AgentError> {
        self.actor.invoke(question).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::transcript::Role;
    use crate::llms::scripted::ScriptedEngine;

    #[tokio::test]
    async fn test_delegates_and_answers() {
        let weather_engine = Arc::new(ScriptedEngine::new(["It is 22 degrees in Madrid."]));
        let engine = Arc::new(ScriptedEngine::new([
            "<thought>ask the weather agent</thought>\
             <agent_call>{\"name\": \"weather_agent\", \"arguments\": \
             {\"task_description\": \"Weather in Madrid\", \"context\": \"\"}, \"id\": 0}</agent_call>",
            "<response>22 degrees in Madrid.</response>",
        ]));

        let mut orchestrator = Orchestrator::new(engine.clone());
        orchestrator
            .bind_agent(
                AgentBlueprint::new("weather_agent", weather_engine.clone())
                    .with_description("Knows the weather"),
            )
            .unwrap();
        assert_eq!(orchestrator.agents(), "weather_agent");

        let output = orchestrator.invoke("Weather in Madrid?").await.unwrap();
        assert_eq!(output.text, "22 degrees in Madrid.");
        assert_eq!(weather_engine.calls(), 1);

        let observation = &output.transcript.messages()[3];
        assert_eq!(observation.role, Role::User);
        assert_eq!(observation.content, r#"{"0": "It is 22 degrees in Madrid."}"#);

        let transcripts = engine.transcripts();
        let system = &transcripts[0].messages()[0].content;
        assert!(system.contains("<agents>"));
        assert!(system.contains("Knows the weather"));
    }

    #[test]
    fn test_duplicate_agent_rejected() {
        let engine = Arc::new(ScriptedEngine::new(Vec::<String>::new()));
        let mut orchestrator = Orchestrator::new(engine.clone());
        orchestrator
            .bind_agent(AgentBlueprint::new("mail_agent", engine.clone()))
            .unwrap();
        let err = orchestrator
            .bind_agent(AgentBlueprint::new("mail_agent", engine))
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateCapability("mail_agent".to_string()));
    }
}
