//! Task nodes.
//!
//! This module contains the [`Agent`] struct: an actor bound to a fixed
//! task, an expected output and the context its upstream agents produced.

pub mod core;

// Re-export the main Agent type.
pub use self::core::{Agent, ContextEntry, NodeId};
