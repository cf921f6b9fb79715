//! Execution configuration for actors and crews.
//!
//! Values come from code (`Default`) or from YAML documents such as:
//!
//! ```yaml
//! process: parallel
//! actor:
//!   max_iterations: 5
//!   engine_timeout_secs: 60
//!   retry:
//!     max_retries: 2
//!     backoff_ms: 250
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::process::Process;
use crate::utilities::errors::ConfigError;

fn default_max_iterations() -> u32 {
    10
}

fn default_engine_timeout_secs() -> u64 {
    120
}

fn default_capability_timeout_secs() -> u64 {
    60
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

/// Retry policy for reasoning-engine calls. No retries unless configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    #[serde(default)]
    pub max_retries: u32,
    /// Delay before the first retry.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Factor applied to the delay after every retry.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff_ms: default_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.backoff_multiplier.max(1.0).powi(retry.saturating_sub(1) as i32);
        Duration::from_millis((self.backoff_ms as f64 * factor) as u64)
    }
}

/// Settings for one reasoning loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorConfig {
    /// Think/act/observe turns before the loop forces a final answer.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Upper bound for a single completion.
    #[serde(default = "default_engine_timeout_secs")]
    pub engine_timeout_secs: u64,
    /// Upper bound for a single capability invocation.
    #[serde(default = "default_capability_timeout_secs")]
    pub capability_timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Print colored progress to stdout.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            engine_timeout_secs: default_engine_timeout_secs(),
            capability_timeout_secs: default_capability_timeout_secs(),
            retry: RetryPolicy::default(),
            verbose: false,
        }
    }
}

impl ActorConfig {
    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_timeout_secs)
    }

    pub fn capability_timeout(&self) -> Duration {
        Duration::from_secs(self.capability_timeout_secs)
    }

    /// Both timeouts must be non-zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "actor.engine_timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.capability_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "actor.capability_timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Settings for one crew run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewConfig {
    #[serde(default)]
    pub process: Process,
    /// Forward upstream context along with each producer's own output, so a
    /// node sees every ancestor and not only its direct dependencies.
    #[serde(default = "default_true")]
    pub propagate_transitive: bool,
    /// Defaults for agents that do not carry their own actor settings.
    #[serde(default)]
    pub actor: ActorConfig,
}

impl Default for CrewConfig {
    fn default() -> Self {
        Self {
            process: Process::default(),
            propagate_transitive: true,
            actor: ActorConfig::default(),
        }
    }
}

impl CrewConfig {
    /// Parse a YAML document; absent keys take their defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: CrewConfig = serde_yaml::from_str(content)?;
        config.actor.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Loaded crew config from {}", path.as_ref().display());
        Self::from_yaml_str(&content)
    }

    /// Apply key-wise overrides (e.g. `{"process": "parallel"}`) on top of
    /// this configuration.
    pub fn with_overrides(&self, overrides: &HashMap<String, Value>) -> Result<Self, ConfigError> {
        let current = serde_json::to_value(self).map_err(|e| ConfigError::Invalid {
            key: "<root>".to_string(),
            message: e.to_string(),
        })?;
        let defaults: HashMap<String, Value> = match current {
            Value::Object(map) => map.into_iter().collect(),
            _ => HashMap::new(),
        };
        let merged = process_config(overrides, &defaults);
        let merged = Value::Object(merged.into_iter().collect());
        let config: CrewConfig =
            serde_json::from_value(merged).map_err(|e| ConfigError::Invalid {
                key: "<overrides>".to_string(),
                message: e.to_string(),
            })?;
        config.actor.validate()?;
        Ok(config)
    }
}

/// Merge a configuration map over defaults.
pub fn process_config(
    config: &HashMap<String, Value>,
    defaults: &HashMap<String, Value>,
) -> HashMap<String, Value> {
    let mut result = defaults.clone();
    for (key, value) in config {
        result.insert(key.clone(), value.clone());
    }
    result
}
