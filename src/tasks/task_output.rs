//! Output of one task node.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::agents::actor::ActorOutput;
use crate::agents::transcript::Transcript;

/// Result of one task node's run.
///
/// # Fields
///
/// * `agent` - Name of the node that produced it
/// * `description` - Task description the node was given
/// * `summary` - First ten words of the description
/// * `raw` - Final text of the node's actor
/// * `transcript` - Full message history of the run
/// * `budget_exhausted` - The answer came from the forced final completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutput {
    pub agent: String,
    pub description: String,
    pub summary: String,
    pub raw: String,
    #[serde(default)]
    pub transcript: Transcript,
    #[serde(default)]
    pub budget_exhausted: bool,
}

impl TaskOutput {
    pub fn new(agent: impl Into<String>, description: impl Into<String>, output: ActorOutput) -> Self {
        let description = description.into();
        Self {
            agent: agent.into(),
            summary: Self::generate_summary(&description),
            description,
            raw: output.text,
            transcript: output.transcript,
            budget_exhausted: output.budget_exhausted,
        }
    }

    /// First 10 words of the description followed by "...".
    fn generate_summary(description: &str) -> String {
        let excerpt: String = description
            .split_whitespace()
            .take(10)
            .collect::<Vec<&str>>()
            .join(" ");
        format!("{}...", excerpt)
    }

    /// The raw text parsed as JSON, when it is JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(self.raw.trim()).ok()
    }
}

impl fmt::Display for TaskOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
