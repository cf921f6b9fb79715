//! Process types for crew execution.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a crew schedules its agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Process {
    /// One agent at a time, in topological order.
    #[default]
    Sequential,
    /// Every agent whose dependencies are done runs concurrently with the
    /// other ready agents of the same wave.
    Parallel,
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Process::Sequential => write!(f, "sequential"),
            Process::Parallel => write!(f, "parallel"),
        }
    }
}
