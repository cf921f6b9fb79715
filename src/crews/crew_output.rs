//! Crew output representation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::tasks::task_output::TaskOutput;

/// Result of a crew run.
///
/// # Fields
///
/// * `raw` - Raw output of the last node executed.
/// * `tasks_output` - Output of each node in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewOutput {
    pub raw: String,
    pub tasks_output: Vec<TaskOutput>,
}

impl CrewOutput {
    /// `raw` is taken from the last task output.
    pub fn new(tasks_output: Vec<TaskOutput>) -> Self {
        let raw = tasks_output
            .last()
            .map(|t| t.raw.clone())
            .unwrap_or_default();
        Self { raw, tasks_output }
    }

    /// Output of the node called `agent`.
    pub fn get(&self, agent: &str) -> Option<&TaskOutput> {
        self.tasks_output.iter().find(|t| t.agent == agent)
    }

    /// Node names in execution order.
    pub fn execution_order(&self) -> Vec<&str> {
        self.tasks_output.iter().map(|t| t.agent.as_str()).collect()
    }
}

impl fmt::Display for CrewOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
