//! The capability-call wire unit.
//!
//! A call segment is the JSON found between call tags:
//! `{"name": "get_weather", "arguments": {"location": "Madrid"}, "id": 0}`.
//! Parsing is strict: unknown top-level fields, a missing name or a
//! non-integer id are rejected before anything is dispatched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::capability::Arguments;
use crate::utilities::errors::CallError;

/// Identifier the model assigns to a call; correlates call and observation.
pub type CallId = i64;

/// A parsed call request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityCall {
    /// The capability to invoke.
    pub name: String,
    /// Keyword arguments.
    #[serde(default)]
    pub arguments: Arguments,
    pub id: CallId,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCall {
    name: String,
    #[serde(default)]
    arguments: Value,
    id: CallId,
}

impl CapabilityCall {
    pub fn new(name: impl Into<String>, arguments: Arguments, id: CallId) -> Self {
        Self {
            name: name.into(),
            arguments,
            id,
        }
    }

    /// Parse one call segment.
    ///
    /// `arguments` may be an object, a JSON string holding an object, or
    /// absent/null (no arguments).
    pub fn parse(segment: &str) -> Result<Self, CallError> {
        let body = strip_code_fence(segment);
        let raw: RawCall =
            serde_json::from_str(body).map_err(|e| CallError::Malformed(e.to_string()))?;

        let arguments = match raw.arguments {
            Value::Null => Arguments::new(),
            Value::Object(map) => map.into_iter().collect(),
            Value::String(s) => {
                let parsed: serde_json::Map<String, Value> = serde_json::from_str(&s)
                    .map_err(|e| CallError::Malformed(format!("arguments: {}", e)))?;
                parsed.into_iter().collect()
            }
            other => {
                return Err(CallError::Malformed(format!(
                    "arguments must be an object, got {}",
                    other
                )))
            }
        };

        if raw.name.trim().is_empty() {
            return Err(CallError::Malformed("empty capability name".to_string()));
        }

        Ok(Self {
            name: raw.name.trim().to_string(),
            arguments,
            id: raw.id,
        })
    }
}

/// Remove a surrounding Markdown code fence (```` ```json ... ``` ````).
fn strip_code_fence(segment: &str) -> &str {
    let trimmed = segment.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // Drop the language hint on the opening line.
    match rest.find('\n') {
        Some(idx) if !rest[..idx].trim_start().starts_with('{') => rest[idx + 1..].trim(),
        _ => rest.trim(),
    }
}
