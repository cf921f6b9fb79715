//! Capabilities (tools) for agents.
//!
//! This module provides capability registration and argument validation,
//! the bound capability set, call parsing, per-turn dispatch and agents
//! exposed as capabilities.

pub mod agent_tools;
pub mod capability;
pub mod registry;
pub mod tool_calling;
pub mod tool_usage;

// Re-exports for convenience
pub use agent_tools::AgentBlueprint;
pub use capability::{Arguments, Capability, CapabilityBuilder, Handler, ParamType, Parameter};
pub use registry::CapabilitySet;
pub use tool_calling::{CallId, CapabilityCall};
pub use tool_usage::{process_calls, Observation, ObservationSet};
