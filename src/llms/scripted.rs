//! A deterministic in-process completion engine.
//!
//! Replies come from a queue of scripted completions, then from an optional
//! responder function. Every transcript it receives is recorded, which makes
//! it the engine of choice for tests and demos.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::base_llm::CompletionEngine;
use crate::agents::transcript::Transcript;
use crate::utilities::errors::EngineError;

type Responder = Arc<dyn Fn(&Transcript) -> String + Send + Sync>;

/// Scripted completion engine.
pub struct ScriptedEngine {
    model: String,
    script: Mutex<VecDeque<Result<String, EngineError>>>,
    responder: Option<Responder>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    transcripts: Mutex<Vec<Transcript>>,
}

impl fmt::Debug for ScriptedEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedEngine")
            .field("model", &self.model)
            .field("calls", &self.calls())
            .field("has_responder", &self.responder.is_some())
            .finish()
    }
}

impl ScriptedEngine {
    /// Engine replying with `replies` in order.
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            model: "scripted".to_string(),
            script: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            responder: None,
            delay: None,
            calls: AtomicUsize::new(0),
            transcripts: Mutex::new(Vec::new()),
        }
    }

    /// Engine computing every reply from the transcript.
    pub fn responder<F>(f: F) -> Self
    where
        F: Fn(&Transcript) -> String + Send + Sync + 'static,
    {
        let mut engine = Self::new(Vec::<String>::new());
        engine.responder = Some(Arc::new(f));
        engine
    }

    /// Queue another reply.
    pub fn then_reply(self, reply: impl Into<String>) -> Self {
        self.enqueue(Ok(reply.into()))
    }

    /// Queue a provider failure.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.enqueue(Err(EngineError::Provider(message.into())))
    }

    /// Wait this long before every reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn enqueue(self, item: Result<String, EngineError>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(item);
        }
        self
    }

    /// Number of completions requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every transcript received, in call order.
    pub fn transcripts(&self) -> Vec<Transcript> {
        self.transcripts
            .lock()
            .map(|t| t.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CompletionEngine for ScriptedEngine {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, transcript: &Transcript) -> Result<String, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.transcripts.lock() {
            seen.push(transcript.clone());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .script
            .lock()
            .map_err(|_| EngineError::Provider("script lock poisoned".to_string()))?
            .pop_front();

        match (next, &self.responder) {
            (Some(reply), _) => reply,
            (None, Some(responder)) => Ok(responder(transcript)),
            (None, None) => Err(EngineError::Provider("script exhausted".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_then_responder_fallback() {
        let mut engine = ScriptedEngine::responder(|t| format!("seen {}", t.len()));
        engine = engine.then_reply("first");
        let mut transcript = Transcript::new();
        assert_eq!(engine.complete(&transcript).await.unwrap(), "first");
        transcript.user("hi");
        assert_eq!(engine.complete(&transcript).await.unwrap(), "seen 1");
        assert_eq!(engine.calls(), 2);
        assert_eq!(engine.transcripts()[1].len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_script_fails() {
        let engine = ScriptedEngine::new(Vec::<String>::new());
        let err = engine.complete(&Transcript::new()).await.unwrap_err();
        assert!(matches!(err, EngineError::Provider(_)));
    }
}
