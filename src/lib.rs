//! # agentcrew
//!
//! Tool-calling LLM agents and dependency-graph orchestration.
//!
//! An [`Actor`] runs a think/act/observe loop over a [`CompletionEngine`],
//! calling typed [`Capability`] handlers the model asks for through
//! `<tool_call>` tags. An [`Agent`] binds an actor to one task, and a
//! [`Crew`] runs agents in dependency order, feeding each agent's output
//! into the context of the agents that depend on it.

pub mod agent;
pub mod agents;
pub mod crew;
pub mod crews;
pub mod llms;
pub mod process;
pub mod tasks;
pub mod tools;
pub mod utilities;

// Re-exports
pub use agent::Agent;
pub use agents::{Actor, ActorOutput, Orchestrator, ToolAgent};
pub use crew::Crew;
pub use crews::crew_output::CrewOutput;
pub use llms::base_llm::CompletionEngine;
pub use process::Process;
pub use tasks::task_output::TaskOutput;
pub use tools::{AgentBlueprint, Capability, CapabilitySet, Handler};
pub use utilities::config::{ActorConfig, CrewConfig, RetryPolicy};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
