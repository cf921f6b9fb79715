//! The reasoning-engine boundary.
//!
//! Any completion provider that can turn an ordered transcript into text
//! implements [`CompletionEngine`]. Timeouts and retries are applied around
//! the engine by [`complete_with_policy`], never inside it.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::agents::transcript::Transcript;
use crate::utilities::config::RetryPolicy;
use crate::utilities::errors::EngineError;

/// A completion provider.
///
/// Implementations should report provider failures as
/// `EngineError::Provider`; timeouts are enforced by the caller.
#[async_trait]
pub trait CompletionEngine: Send + Sync + fmt::Debug {
    /// Model identifier, for logging.
    fn model(&self) -> &str {
        "unknown"
    }

    /// Produce the next assistant text for `transcript`.
    async fn complete(&self, transcript: &Transcript) -> Result<String, EngineError>;
}

/// Call `engine` with a per-attempt timeout and the configured retries.
///
/// With `max_retries == 0` the first error is returned unchanged; otherwise
/// the last error is wrapped in `EngineError::Exhausted`.
pub async fn complete_with_policy(
    engine: &dyn CompletionEngine,
    transcript: &Transcript,
    timeout: Duration,
    retry: &RetryPolicy,
) -> Result<String, EngineError> {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let result = match tokio::time::timeout(timeout, engine.complete(transcript)).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::Timeout {
                secs: timeout.as_secs(),
            }),
        };

        match result {
            Ok(text) => return Ok(text),
            Err(err) if attempt > retry.max_retries => {
                log::error!("Completion with model '{}' failed: {}", engine.model(), err);
                return Err(if retry.max_retries == 0 {
                    err
                } else {
                    EngineError::Exhausted {
                        attempts: attempt,
                        last: err.to_string(),
                    }
                });
            }
            Err(err) => {
                let delay = retry.delay_for(attempt);
                log::warn!(
                    "Completion attempt {} with model '{}' failed: {}; retrying in {:?}",
                    attempt,
                    engine.model(),
                    err,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
