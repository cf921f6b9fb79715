//! Completion engines.
//!
//! - [`base_llm`] - The engine trait and the timeout/retry wrapper
//! - [`scripted`] - A deterministic engine for tests and demos

pub mod base_llm;
pub mod scripted;

// Re-exports for convenience
pub use base_llm::{complete_with_policy, CompletionEngine};
pub use scripted::ScriptedEngine;
