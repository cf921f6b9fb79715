//! Agents exposed as capabilities.
//!
//! An orchestrator delegates work by calling other agents the same way an
//! actor calls tools.

pub mod agent_blueprint;

pub use agent_blueprint::AgentBlueprint;
