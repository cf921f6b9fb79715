//! Conversation state fed to the reasoning engine.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single message in provider format (`{"role": ..., "content": ...}`).
pub type LLMMessage = HashMap<String, Value>;

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// When set, the content is presented as `<tag>content</tag>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tag: None,
        }
    }

    pub fn tagged(role: Role, content: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tag: Some(tag.into()),
        }
    }

    /// Content as the engine sees it.
    pub fn rendered(&self) -> String {
        match &self.tag {
            Some(tag) => format!("<{0}>{1}</{0}>", tag, self.content),
            None => self.content.clone(),
        }
    }
}

/// Ordered, append-only message history of one actor run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn system(&mut self, content: impl Into<String>) {
        self.push(Message::new(Role::System, content));
    }

    pub fn user(&mut self, content: impl Into<String>) {
        self.push(Message::new(Role::User, content));
    }

    pub fn assistant(&mut self, content: impl Into<String>) {
        self.push(Message::new(Role::Assistant, content));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages in provider format with tags applied.
    pub fn to_llm_messages(&self) -> Vec<LLMMessage> {
        self.messages
            .iter()
            .map(|m| {
                let mut msg = LLMMessage::new();
                msg.insert("role".to_string(), Value::String(m.role.to_string()));
                msg.insert("content".to_string(), Value::String(m.rendered()));
                msg
            })
            .collect()
    }
}
