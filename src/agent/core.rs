//! Task node: an actor bound to one task.
//!
//! An [`Agent`] carries a fixed task description, an expected-output
//! contract and an append-only buffer of context received from upstream
//! agents. Running it renders all three into one instruction, hands that to
//! a fresh [`Actor`] and stores the result. The output is produced at most
//! once until [`Agent::reset`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agents::actor::Actor;
use crate::llms::base_llm::CompletionEngine;
use crate::tasks::task_output::TaskOutput;
use crate::tools::capability::Capability;
use crate::tools::registry::CapabilitySet;
use crate::utilities::config::ActorConfig;
use crate::utilities::errors::{AgentError, SchemaError, TemplateError};
use crate::utilities::prompts::{self, TaskPromptInput, TASK_PROMPT};

/// Index of an agent inside its crew.
pub type NodeId = usize;

/// One piece of inbound context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    /// Name of the agent that produced `text`.
    pub producer: String,
    /// Crew node that produced `text`; `None` for context supplied from
    /// outside the crew.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<NodeId>,
    pub text: String,
}

impl ContextEntry {
    pub fn new(producer: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            producer: producer.into(),
            source: None,
            text: text.into(),
        }
    }

    pub fn from_node(source: NodeId, producer: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: Some(source),
            ..Self::new(producer, text)
        }
    }

    pub fn render(&self) -> String {
        format!("{} produced the following output:\n{}", self.producer, self.text)
    }
}

/// A task node.
#[derive(Clone)]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    pub backstory: String,
    pub task_description: String,
    pub expected_output: String,
    capabilities: CapabilitySet,
    engine: Arc<dyn CompletionEngine>,
    /// Overrides the crew's actor settings when set.
    config: Option<ActorConfig>,
    template: Option<String>,
    context: Vec<ContextEntry>,
    output: Option<TaskOutput>,
    pub(crate) dependencies: Vec<NodeId>,
    pub(crate) dependents: Vec<NodeId>,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities.names())
            .field("context_entries", &self.context.len())
            .field("has_output", &self.output.is_some())
            .field("dependencies", &self.dependencies)
            .field("dependents", &self.dependents)
            .finish()
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        task_description: impl Into<String>,
        engine: Arc<dyn CompletionEngine>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            backstory: String::new(),
            task_description: task_description.into(),
            expected_output: String::new(),
            capabilities: CapabilitySet::new(),
            engine,
            config: None,
            template: None,
            context: Vec::new(),
            output: None,
            dependencies: Vec::new(),
            dependents: Vec::new(),
        }
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
        self.config = Some(config);
        self
    }

    /// Custom instruction template; see [`prompts::TASK_PROMPT`] for the
    /// available variables.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn bind(&mut self, capability: Capability) -> Result<(), SchemaError> {
        self.capabilities.bind(capability)
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn engine(&self) -> &Arc<dyn CompletionEngine> {
        &self.engine
    }

    /// Indices of the agents this one waits for.
    pub fn dependencies(&self) -> &[NodeId] {
        &self.dependencies
    }

    /// Indices of the agents waiting for this one.
    pub fn dependents(&self) -> &[NodeId] {
        &self.dependents
    }

    /// Append context. Entries are never removed during a run.
    pub fn receive_context(&mut self, producer: impl Into<String>, text: impl Into<String>) {
        self.receive_entry(ContextEntry::new(producer, text));
    }

    pub fn receive_entry(&mut self, entry: ContextEntry) {
        log::debug!("Agent '{}' received context from '{}'", self.name, entry.producer);
        self.context.push(entry);
    }

    pub fn context(&self) -> &[ContextEntry] {
        &self.context
    }

    /// Whether context from an agent called `producer` already arrived.
    pub fn has_context_from(&self, producer: &str) -> bool {
        self.context.iter().any(|e| e.producer == producer)
    }

    /// Whether `entry` (or another entry from the same crew node) already
    /// arrived. Entries without a node are compared whole.
    pub fn has_entry(&self, entry: &ContextEntry) -> bool {
        match entry.source {
            Some(source) => self.context.iter().any(|e| e.source == Some(source)),
            None => self.context.contains(entry),
        }
    }

    /// Context entries joined by blank lines; empty when nothing arrived.
    pub fn context_text(&self) -> String {
        self.context
            .iter()
            .map(ContextEntry::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// The instruction handed to the actor.
    pub fn render_prompt(&self) -> Result<String, TemplateError> {
        let context = self.context_text();
        prompts::task_prompt(
            self.template.as_deref().unwrap_or(TASK_PROMPT),
            &TaskPromptInput {
                name: &self.name,
                backstory: &self.backstory,
                task_description: &self.task_description,
                expected_output: &self.expected_output,
                context: &context,
            },
        )
    }

    pub fn output(&self) -> Option<&TaskOutput> {
        self.output.as_ref()
    }

    /// Clear per-run state (context and output). Edges are kept.
    pub fn reset(&mut self) {
        self.context.clear();
        self.output = None;
    }

    /// Run the task with `defaults` unless this agent carries its own
    /// actor settings. Fails with `AlreadyRan` when the output exists.
    pub async fn execute(&mut self, defaults: &ActorConfig) -> Result<TaskOutput, AgentError> {
        if self.output.is_some() {
            return Err(AgentError::AlreadyRan(self.name.clone()));
        }

        let instruction = self.render_prompt()?;
        let actor = Actor::new(Arc::clone(&self.engine))
            .with_name(self.name.clone())
            .with_capabilities(self.capabilities.clone())
            .with_config(self.config.clone().unwrap_or_else(|| defaults.clone()));

        log::info!("Agent '{}' started", self.name);
        let result = actor.invoke(&instruction).await?;
        if result.budget_exhausted {
            log::warn!("Agent '{}' answered after exhausting its iteration budget", self.name);
        }

        let output = TaskOutput::new(self.name.clone(), self.task_description.clone(), result);
        self.output = Some(output.clone());
        log::info!("Agent '{}' finished", self.name);
        Ok(output)
    }

    /// Run standalone with default settings.
    pub async fn run(&mut self) -> Result<TaskOutput, AgentError> {
        self.execute(&ActorConfig::default()).await
    }
}
