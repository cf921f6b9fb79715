//! Reasoning agents.
//!
//! This module provides the transcript, the structured-tag parser, the
//! think/act/observe [`Actor`], the single-shot [`ToolAgent`] and the
//! delegating [`Orchestrator`].

pub mod actor;
pub mod orchestrator;
pub mod parser;
pub mod tool_agent;
pub mod transcript;

// Re-exports for convenience
pub use actor::{Actor, ActorOutput};
pub use orchestrator::Orchestrator;
pub use parser::{extract_tag_content, parse_turn, AgentAction, AgentFinish, ParsedTurn, TagContent};
pub use tool_agent::ToolAgent;
pub use transcript::{Message, Role, Transcript};
