//! Structured-tag extraction for model output.
//!
//! The engine talks back through three tags embedded in free text:
//!
//! ```text
//! <thought>I need the weather in Madrid</thought>
//! <tool_call>{"name": "get_weather", "arguments": {"location": "Madrid"}, "id": 0}</tool_call>
//! <response>It is 22 degrees in Madrid.</response>
//! ```
//!
//! Everything else is commentary and ignored. No other module inspects raw
//! completion text.

use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Tag holding the terminal answer.
pub const RESPONSE_TAG: &str = "response";
/// Tag holding the model's reasoning.
pub const THOUGHT_TAG: &str = "thought";
/// Default tag holding a capability call.
pub const TOOL_CALL_TAG: &str = "tool_call";

static TAG_PATTERNS: Lazy<Mutex<HashMap<String, Regex>>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn tag_pattern(tag: &str) -> Regex {
    let build = || {
        let escaped = regex::escape(tag);
        Regex::new(&format!(r"(?s)<{0}>(.*?)</{0}>", escaped))
            .expect("Invalid regex")
    };
    match TAG_PATTERNS.lock() {
        Ok(mut cache) => cache.entry(tag.to_string()).or_insert_with(build).clone(),
        Err(_) => build(),
    }
}

/// Segments found for one tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagContent {
    /// Whether at least one complete `<tag>...</tag>` pair was present.
    pub found: bool,
    /// Text between each pair, first to last. Not trimmed.
    pub content: Vec<String>,
}

/// Extract every non-overlapping `<tag>...</tag>` segment.
///
/// Never fails: absent or unterminated tags yield `found == false`, an empty
/// pair yields one empty segment. Nested tags of the same name are not
/// supported; the first closing tag ends the segment.
pub fn extract_tag_content(text: &str, tag: &str) -> TagContent {
    let content: Vec<String> = tag_pattern(tag)
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect();
    TagContent {
        found: !content.is_empty(),
        content,
    }
}

// ---------------------------------------------------------------------------
// Turn classification
// ---------------------------------------------------------------------------

/// The model wants to act (or produced neither tag).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentAction {
    pub thoughts: Vec<String>,
    /// Raw call segments in extracted order.
    pub calls: Vec<String>,
}

/// The model produced a terminal response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentFinish {
    pub thoughts: Vec<String>,
    /// First response segment, exactly as the engine wrote it.
    pub output: String,
}

/// Classification of one completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedTurn {
    Action(AgentAction),
    Finish(AgentFinish),
}

/// Classify a completion. A response tag wins over any call tags in the
/// same text.
pub fn parse_turn(text: &str, call_tag: &str) -> ParsedTurn {
    let thoughts = extract_tag_content(text, THOUGHT_TAG)
        .content
        .into_iter()
        .map(|t| t.trim().to_string())
        .collect();

    let response = extract_tag_content(text, RESPONSE_TAG);
    if let Some(first) = response.content.into_iter().next() {
        return ParsedTurn::Finish(AgentFinish {
            thoughts,
            output: first,
        });
    }

    ParsedTurn::Action(AgentAction {
        thoughts,
        calls: extract_tag_content(text, call_tag).content,
    })
}
