//! Dispatch of one turn's capability calls.
//!
//! Every call segment of a turn goes through parse → id check → lookup →
//! validation → invocation, in extracted order. Failures are recorded per
//! call and never stop the remaining calls.

use std::collections::HashSet;
use std::time::Duration;

use serde_json::{json, Value};

use super::registry::CapabilitySet;
use super::tool_calling::{CallId, CapabilityCall};
use crate::utilities::errors::CallError;
use crate::utilities::logger::Logger;

/// Result of a single call.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Output(Value),
    Failure(CallError),
}

impl Observation {
    /// JSON shown to the engine. Failures render as `{"error": "<message>"}`.
    pub fn to_json(&self) -> Value {
        match self {
            Observation::Output(value) => value.clone(),
            Observation::Failure(err) => json!({ "error": err.to_string() }),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Observation::Failure(_))
    }
}

/// Observations of one turn keyed by call id, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationSet {
    entries: Vec<(CallId, Observation)>,
    /// Segments that never got an id slot (malformed, duplicate id).
    rejected: Vec<String>,
}

impl ObservationSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, id: CallId, observation: Observation) {
        self.entries.push((id, observation));
    }

    pub fn get(&self, id: CallId) -> Option<&Observation> {
        self.entries.iter().find(|(k, _)| *k == id).map(|(_, v)| v)
    }

    pub fn contains(&self, id: CallId) -> bool {
        self.get(id).is_some()
    }

    /// Call ids in first-seen order.
    pub fn ids(&self) -> Vec<CallId> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(CallId, Observation)> {
        self.entries.iter()
    }

    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.rejected.is_empty()
    }

    /// Text merged into the transcript, e.g.
    /// `{"0": {"temperature": 22}, "1": {"error": "unknown capability: x"}}`.
    pub fn render(&self) -> String {
        let body = self
            .entries
            .iter()
            .map(|(id, obs)| format!("\"{}\": {}", id, obs.to_json()))
            .collect::<Vec<_>>()
            .join(", ");
        let mut rendered = format!("{{{}}}", body);
        if !self.rejected.is_empty() {
            rendered.push_str("\nRejected calls:");
            for reason in &self.rejected {
                rendered.push_str("\n- ");
                rendered.push_str(reason);
            }
        }
        rendered
    }
}

/// Process every call segment of one turn.
pub async fn process_calls(
    segments: &[String],
    capabilities: &CapabilitySet,
    timeout: Duration,
    logger: &Logger,
) -> ObservationSet {
    let mut observations = ObservationSet::new();
    let mut seen: HashSet<CallId> = HashSet::new();

    for (position, segment) in segments.iter().enumerate() {
        let call = match CapabilityCall::parse(segment) {
            Ok(call) => call,
            Err(err) => {
                logger.error(&format!("call segment #{}: {}", position, err));
                observations.rejected.push(format!("call segment #{}: {}", position, err));
                continue;
            }
        };

        if !seen.insert(call.id) {
            let err = CallError::DuplicateCallId(call.id);
            logger.error(&format!("'{}': {}", call.name, err));
            observations
                .rejected
                .push(format!("call segment #{} ('{}'): {}", position, call.name, err));
            continue;
        }

        let id = call.id;
        let observation = match dispatch(call, capabilities, timeout, logger).await {
            Ok(value) => Observation::Output(value),
            Err(err) => {
                logger.error(&err.to_string());
                Observation::Failure(err)
            }
        };
        observations.insert(id, observation);
    }

    observations
}

async fn dispatch(
    call: CapabilityCall,
    capabilities: &CapabilitySet,
    timeout: Duration,
    logger: &Logger,
) -> Result<Value, CallError> {
    let capability = capabilities
        .get(&call.name)
        .ok_or_else(|| CallError::UnknownCapability(call.name.clone()))?;

    let validated = capability.validate_and_coerce(call)?;
    logger.tool_use(&format!(
        "{} (id {}) with {}",
        validated.name,
        validated.id,
        json!(validated.arguments)
    ));

    let result = capability.invoke(validated.arguments, timeout).await?;
    logger.observation(&format!("{} -> {}", validated.name, result));
    Ok(result)
}
