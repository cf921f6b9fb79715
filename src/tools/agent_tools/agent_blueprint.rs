//! Agent blueprint capability.
//!
//! An [`AgentBlueprint`] describes an agent without a task. Converted into a
//! [`Capability`], every call builds a fresh task node from the blueprint,
//! seeds it with the caller's context, runs it and returns its output text.

use std::sync::Arc;

use serde_json::Value;

use crate::agent::Agent;
use crate::llms::base_llm::CompletionEngine;
use crate::tools::capability::{Arguments, Capability, Handler};
use crate::tools::registry::CapabilitySet;
use crate::utilities::config::ActorConfig;
use crate::utilities::errors::{BoxError, SchemaError};

/// Producer name attached to context passed in by the caller.
pub const DELEGATION_PRODUCER: &str = "Orchestrator";

/// Template for an agent that receives its task at call time.
#[derive(Debug, Clone)]
pub struct AgentBlueprint {
    pub name: String,
    /// Shown to the orchestrator in the capability signature.
    pub description: String,
    pub backstory: String,
    pub expected_output: String,
    capabilities: CapabilitySet,
    engine: Arc<dyn CompletionEngine>,
    config: ActorConfig,
}

impl AgentBlueprint {
    pub fn new(name: impl Into<String>, engine: Arc<dyn CompletionEngine>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            backstory: String::new(),
            expected_output: String::new(),
            capabilities: CapabilitySet::new(),
            engine,
            config: ActorConfig::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_backstory(mut self, backstory: impl Into<String>) -> Self {
        self.backstory = backstory.into();
        self
    }

    pub fn with_expected_output(mut self, expected_output: impl Into<String>) -> Self {
        self.expected_output = expected_output.into();
        self
    }

    pub fn with_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_config(mut self, config: ActorConfig) -> Self {
        self.config = config;
        self
    }

    /// A fresh task node for `task_description`.
    pub fn instantiate(&self, task_description: impl Into<String>) -> Agent {
        Agent::new(self.name.clone(), task_description, Arc::clone(&self.engine))
            .with_backstory(self.backstory.clone())
            .with_expected_output(self.expected_output.clone())
            .with_capabilities(self.capabilities.clone())
            .with_config(self.config.clone())
    }

    /// Expose the blueprint as a capability taking `task_description` and
    /// an optional `context`.
    pub fn into_capability(self) -> Result<Capability, SchemaError> {
        let description = if self.description.is_empty() {
            format!("Delegate a task to the {} agent.", self.name)
        } else {
            self.description.clone()
        };
        let builder = Capability::builder(self.name.clone())
            .description(description)
            .param("task_description", "str")
            .optional_param("context", "str", Value::String(String::new()));

        let blueprint = Arc::new(self);
        builder.build(Handler::from_async(move |args: Arguments| {
            let blueprint = Arc::clone(&blueprint);
            async move {
                let task = string_arg(&args, "task_description");
                let context = string_arg(&args, "context");

                let mut agent = blueprint.instantiate(task);
                if !context.trim().is_empty() {
                    agent.receive_context(DELEGATION_PRODUCER, context);
                }
                let output = agent.run().await?;
                Ok::<Value, BoxError>(Value::String(output.raw))
            }
        }))
    }
}

fn string_arg(args: &Arguments, key: &str) -> String {
    args.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
