//! The think/act/observe loop.
//!
//! An [`Actor`] owns a completion engine, a set of bound capabilities and its
//! loop settings. Each [`Actor::invoke`] call builds a fresh transcript, so one
//! actor may serve several independent runs.
//!
//! Turn structure:
//!
//! 1. THINK: ask the engine for the next completion.
//! 2. DECIDE: a `<response>` segment ends the run; otherwise thoughts are
//!    logged and call segments are dispatched.
//! 3. ACT/OBSERVE: the raw completion is appended as an assistant entry, then
//!    the observations as one user entry tagged `observation`.
//!
//! When `max_iterations` turns pass without a response the actor appends a
//! note that tool access is over and makes one last completion, returned
//! verbatim.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::parser::{parse_turn, ParsedTurn, TOOL_CALL_TAG};
use super::transcript::{Message, Role, Transcript};
use crate::llms::base_llm::{complete_with_policy, CompletionEngine};
use crate::tools::capability::Capability;
use crate::tools::registry::CapabilitySet;
use crate::tools::tool_usage::process_calls;
use crate::utilities::config::ActorConfig;
use crate::utilities::errors::{AgentError, IterationBudgetExceeded, SchemaError};
use crate::utilities::logger::Logger;
use crate::utilities::prompts::{self, BUDGET_EXHAUSTED_NOTE, REACT_SYSTEM_PROMPT};

/// Tag wrapping the user instruction.
pub const QUESTION_TAG: &str = "question";
/// Tag wrapping merged observations.
pub const OBSERVATION_TAG: &str = "observation";

/// Result of one actor run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorOutput {
    /// Final answer: the response segment untouched, or the verbatim
    /// completion when no response tag was required or the budget ran out.
    pub text: String,
    pub transcript: Transcript,
    /// Think/act/observe turns taken.
    pub iterations: u32,
    pub engine_calls: u32,
    /// The answer came from the forced final completion.
    pub budget_exhausted: bool,
}

/// One think/act/observe loop bound to zero or more capabilities.
#[derive(Clone)]
pub struct Actor {
    name: String,
    engine: Arc<dyn CompletionEngine>,
    capabilities: CapabilitySet,
    config: ActorConfig,
    system_prompt: String,
    call_tag: String,
    loop_template: String,
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("name", &self.name)
            .field("engine", &self.engine)
            .field("capabilities", &self.capabilities.names())
            .field("call_tag", &self.call_tag)
            .field("max_iterations", &self.config.max_iterations)
            .finish()
    }
}

impl Actor {
    pub fn new(engine: Arc<dyn CompletionEngine>) -> Self {
        Self {
            name: "actor".to_string(),
            engine,
            capabilities: CapabilitySet::new(),
            config: ActorConfig::default(),
            system_prompt: String::new(),
            call_tag: TOOL_CALL_TAG.to_string(),
            loop_template: REACT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Name used in log lines.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
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

    /// Base prompt placed ahead of the loop instructions.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Tag the engine must use for calls (`tool_call` by default).
    pub fn with_call_tag(mut self, tag: impl Into<String>) -> Self {
        self.call_tag = tag.into();
        self
    }

    /// Replace the loop system template. It receives `base_prompt`,
    /// `call_tag` and `tools`.
    pub fn with_loop_template(mut self, template: impl Into<String>) -> Self {
        self.loop_template = template.into();
        self
    }

    /// Bind one more capability.
    pub fn bind(&mut self, capability: Capability) -> Result<(), SchemaError> {
        self.capabilities.bind(capability)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn config(&self) -> &ActorConfig {
        &self.config
    }

    pub fn call_tag(&self) -> &str {
        &self.call_tag
    }

    fn initial_transcript(&self, instruction: &str) -> Result<Transcript, AgentError> {
        let mut transcript = Transcript::new();
        if self.capabilities.is_empty() {
            if !self.system_prompt.is_empty() {
                transcript.system(self.system_prompt.clone());
            }
        } else {
            transcript.system(prompts::loop_system_prompt(
                &self.loop_template,
                &self.system_prompt,
                &self.call_tag,
                &self.capabilities.signatures_block(),
            )?);
        }
        transcript.push(Message::tagged(Role::User, instruction, QUESTION_TAG));
        Ok(transcript)
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

    /// Run the loop for `instruction`.
    ///
    /// Per-call failures are fed back to the engine as observations. Only
    /// invalid settings, an engine failure (after the configured retries) or
    /// a broken prompt template end the run with an error.
    pub async fn invoke(&self, instruction: &str) -> Result<ActorOutput, AgentError> {
        self.config.validate()?;
        let logger = Logger::new(self.config.verbose, self.name.clone());
        let mut transcript = self.initial_transcript(instruction)?;

        if self.capabilities.is_empty() {
            let text = self.complete(&transcript).await?;
            transcript.assistant(text.clone());
            log::debug!("Actor '{}' answered without capabilities", self.name);
            return Ok(ActorOutput {
                text,
                transcript,
                iterations: 1,
                engine_calls: 1,
                budget_exhausted: false,
            });
        }

        let mut engine_calls = 0;
        for iteration in 1..=self.config.max_iterations {
            let completion = self.complete(&transcript).await?;
            engine_calls += 1;

            match parse_turn(&completion, &self.call_tag) {
                ParsedTurn::Finish(finish) => {
                    for thought in &finish.thoughts {
                        logger.thought(thought);
                    }
                    logger.final_answer(&finish.output);
                    transcript.assistant(completion);
                    log::debug!(
                        "Actor '{}' finished after {} iteration(s)",
                        self.name,
                        iteration
                    );
                    return Ok(ActorOutput {
                        text: finish.output,
                        transcript,
                        iterations: iteration,
                        engine_calls,
                        budget_exhausted: false,
                    });
                }
                ParsedTurn::Action(action) => {
                    for thought in &action.thoughts {
                        logger.thought(thought);
                    }
                    transcript.assistant(completion);
                    if action.calls.is_empty() {
                        log::debug!(
                            "Actor '{}' iteration {} produced neither calls nor a response",
                            self.name,
                            iteration
                        );
                        continue;
                    }

                    let observations = process_calls(
                        &action.calls,
                        &self.capabilities,
                        self.config.capability_timeout(),
                        &logger,
                    )
                    .await;
                    let rendered = observations.render();
                    logger.observation(&rendered);
                    transcript.push(Message::tagged(Role::User, rendered, OBSERVATION_TAG));
                }
            }
        }

        logger.warning(
            &IterationBudgetExceeded {
                max_iterations: self.config.max_iterations,
            }
            .to_string(),
        );
        transcript.user(BUDGET_EXHAUSTED_NOTE);
        let text = self.complete(&transcript).await?;
        engine_calls += 1;
        transcript.assistant(text.clone());

        Ok(ActorOutput {
            text,
            transcript,
            iterations: self.config.max_iterations,
            engine_calls,
            budget_exhausted: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llms::scripted::ScriptedEngine;
    use crate::tools::capability::Handler;
    use serde_json::json;

    fn weather() -> Capability {
        Capability::builder("get_weather")
            .description("Current weather for a location")
            .param("location", "str")
            .build(Handler::blocking(|args| {
                Ok(json!({"location": args["location"], "temperature": 22}))
            }))
            .unwrap()
    }

    fn square() -> Capability {
        Capability::builder("square")
            .param("a", "int")
            .build(Handler::blocking(|args| {
                let a = args["a"].as_i64().unwrap_or_default();
                Ok(json!(a * a))
            }))
            .unwrap()
    }

    fn actor_with(engine: &Arc<ScriptedEngine>, capabilities: Vec<Capability>) -> Actor {
        Actor::new(engine.clone())
            .with_capabilities(CapabilitySet::try_from_iter(capabilities).unwrap())
    }

    #[tokio::test]
    async fn test_zero_capabilities_single_call_verbatim() {
        let engine = Arc::new(ScriptedEngine::new(["  plain answer, no tags  "]));
        let output = Actor::new(engine.clone()).invoke("hello").await.unwrap();
        assert_eq!(engine.calls(), 1);
        assert_eq!(output.text, "  plain answer, no tags  ");
        assert_eq!(output.engine_calls, 1);

        let seen = &engine.transcripts()[0];
        assert_eq!(seen.len(), 1);
        assert_eq!(seen.messages()[0].rendered(), "<question>hello</question>");
    }

    #[tokio::test]
    async fn test_budget_exhaustion_makes_one_extra_call() {
        let engine = Arc::new(ScriptedEngine::new([
            "<thought>hmm</thought>",
            "<thought>still thinking</thought>",
            "<thought>almost</thought>",
            "best effort answer",
        ]));
        let actor = actor_with(&engine, vec![weather()]).with_config(ActorConfig {
            max_iterations: 3,
            ..ActorConfig::default()
        });
        let output = actor.invoke("What's the weather?").await.unwrap();
        assert_eq!(engine.calls(), 4);
        assert!(output.budget_exhausted);
        assert_eq!(output.text, "best effort answer");

        let last_prompt = engine.transcripts().pop().unwrap();
        assert_eq!(last_prompt.last().unwrap().content, BUDGET_EXHAUSTED_NOTE);
    }

    #[tokio::test]
    async fn test_tool_round_trip_and_transcript_order() {
        let engine = Arc::new(ScriptedEngine::new([
            "<thought>need weather</thought>\
             <tool_call>{\"name\": \"get_weather\", \"arguments\": {\"location\": \"Madrid\"}, \"id\": 0}</tool_call>",
            "<response> It is 22 degrees in Madrid. </response>",
        ]));
        let output = actor_with(&engine, vec![weather()])
            .invoke("What's the weather in Madrid?")
            .await
            .unwrap();

        assert_eq!(output.text, " It is 22 degrees in Madrid. ");
        assert_eq!(output.iterations, 2);

        let roles: Vec<Role> = output.transcript.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        let observation = &output.transcript.messages()[3];
        assert_eq!(observation.tag.as_deref(), Some(OBSERVATION_TAG));
        assert_eq!(
            observation.content,
            r#"{"0": {"location":"Madrid","temperature":22}}"#
        );
        assert!(output.transcript.messages()[0]
            .content
            .contains("\"name\":\"get_weather\""));
    }

    #[tokio::test]
    async fn test_two_calls_one_turn() {
        let engine = Arc::new(ScriptedEngine::new([
            "<tool_call>{\"name\": \"square\", \"arguments\": {\"a\": \"5\"}, \"id\": 0}</tool_call>\
             <tool_call>{\"name\": \"get_weather\", \"arguments\": {\"location\": \"Oslo\"}, \"id\": 1}</tool_call>",
            "<response>done</response>",
        ]));
        let output = actor_with(&engine, vec![weather(), square()])
            .invoke("go")
            .await
            .unwrap();
        let observation = &output.transcript.messages()[3].content;
        assert!(observation.starts_with("{\"0\": 25, \"1\": "));
    }

    #[tokio::test]
    async fn test_unknown_capability_continues_run() {
        let engine = Arc::new(ScriptedEngine::new([
            "<tool_call>{\"name\": \"get_stock\", \"arguments\": {}, \"id\": 0}</tool_call>",
            "<response>I cannot check stock prices.</response>",
        ]));
        let output = actor_with(&engine, vec![weather()])
            .invoke("price of ACME?")
            .await
            .unwrap();
        assert_eq!(output.text, "I cannot check stock prices.");
        let second_prompt = &engine.transcripts()[1];
        assert_eq!(
            second_prompt.last().unwrap().content,
            r#"{"0": {"error":"unknown capability: get_stock"}}"#
        );
    }

    #[tokio::test]
    async fn test_failing_handler_is_observed_and_run_continues() {
        let flaky = Capability::builder("flaky")
            .build(Handler::blocking(|_| Err("boom".into())))
            .unwrap();
        let engine = Arc::new(ScriptedEngine::new([
            "<tool_call>{\"name\": \"flaky\", \"arguments\": {}, \"id\": 0}</tool_call>",
            "<response>The service is down.</response>",
        ]));
        let output = actor_with(&engine, vec![flaky]).invoke("try it").await.unwrap();
        assert_eq!(output.text, "The service is down.");
        assert_eq!(engine.calls(), 2);
        assert_eq!(
            engine.transcripts()[1].last().unwrap().content,
            r#"{"0": {"error":"capability 'flaky' failed: boom"}}"#
        );
    }

    #[tokio::test]
    async fn test_zero_timeout_rejected_before_engine_call() {
        let engine = Arc::new(ScriptedEngine::new(["unused"]));
        let err = actor_with(&engine, vec![weather()])
            .with_config(ActorConfig {
                engine_timeout_secs: 0,
                ..ActorConfig::default()
            })
            .invoke("anything")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test]
    async fn test_engine_failure_is_fatal() {
        let engine = Arc::new(ScriptedEngine::new(Vec::<String>::new()).then_fail("offline"));
        let err = actor_with(&engine, vec![weather()])
            .invoke("anything")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Engine(_)));
    }

    #[tokio::test]
    async fn test_custom_call_tag() {
        let engine = Arc::new(ScriptedEngine::new([
            "<agent_call>{\"name\": \"square\", \"arguments\": {\"a\": 3}, \"id\": 7}</agent_call>",
            "<response>9</response>",
        ]));
        let output = actor_with(&engine, vec![square()])
            .with_call_tag("agent_call")
            .invoke("square 3")
            .await
            .unwrap();
        assert_eq!(output.transcript.messages()[3].content, "{\"7\": 9}");
        assert!(engine.transcripts()[0].messages()[0].content.contains("<agent_call>"));
    }
}
