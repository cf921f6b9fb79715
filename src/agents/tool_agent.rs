//! Single-shot tool agent.
//!
//! One completion decides which capabilities to call; a second completion,
//! over a separate answering transcript that holds the question and the
//! observations, produces the answer. There is no loop.

use std::sync::Arc;

use super::actor::QUESTION_TAG;
use super::parser::{extract_tag_content, TOOL_CALL_TAG};
use super::transcript::{Message, Role, Transcript};
use crate::llms::base_llm::{complete_with_policy, CompletionEngine};
use crate::tools::capability::Capability;
use crate::tools::registry::CapabilitySet;
use crate::tools::tool_usage::process_calls;
use crate::utilities::config::ActorConfig;
use crate::utilities::errors::{AgentError, SchemaError};
use crate::utilities::logger::Logger;
use crate::utilities::prompts::{self, ANSWER_SYSTEM_PROMPT, TOOL_SYSTEM_PROMPT};

/// Calls tools once, then answers.
#[derive(Debug, Clone)]
pub struct ToolAgent {
    engine: Arc<dyn CompletionEngine>,
    capabilities: CapabilitySet,
    config: ActorConfig,
}

impl ToolAgent {
    pub fn new(engine: Arc<dyn CompletionEngine>) -> Self {
        Self {
            engine,
            capabilities: CapabilitySet::new(),
            config: ActorConfig::default(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_config(mut self, config: ActorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bind(&mut self, capability: Capability) -> Result<(), SchemaError> {
        self.capabilities.bind(capability)
    }

    async fn complete(&self, transcript: &Transcript) -> Result<String, AgentError> {
        Ok(complete_with_policy(
            self.engine.as_ref(),
            transcript,
            self.config.engine_timeout(),
            &self.config.retry,
        )
        .await?)
    }

    /// Answer `question`, calling tools at most once.
    pub async fn invoke(&self, question: &str) -> Result<String, AgentError> {
        self.config.validate()?;
        let logger = Logger::new(self.config.verbose, "ToolAgent");

        let mut calling = Transcript::new();
        calling.system(prompts::loop_system_prompt(
            TOOL_SYSTEM_PROMPT,
            "",
            TOOL_CALL_TAG,
            &self.capabilities.signatures_block(),
        )?);
        calling.push(Message::tagged(Role::User, question, QUESTION_TAG));

        let mut answering = Transcript::new();
        answering.system(ANSWER_SYSTEM_PROMPT);
        answering.push(Message::tagged(Role::User, question, QUESTION_TAG));

        let completion = self.complete(&calling).await?;
        let calls = extract_tag_content(&completion, TOOL_CALL_TAG);
        if calls.found {
            let observations = process_calls(
                &calls.content,
                &self.capabilities,
                self.config.capability_timeout(),
                &logger,
            )
            .await;
            let rendered = observations.render();
            logger.observation(&rendered);
            answering.user(format!("Observation: {}", rendered));
        } else {
            log::debug!("Tool agent made no calls for: {}", question);
        }

        self.complete(&answering).await
    }
}
