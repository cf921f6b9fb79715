//! Error types for agentcrew.
//!
//! Registration and graph-construction errors are fatal to the caller.
//! `CallError` values never abort a turn: the loop renders them as the
//! observation for the offending call id.

use thiserror::Error;

/// Boxed error returned by capability handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A capability could not be registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The capability has no name.
    #[error("capability name must not be empty")]
    EmptyName,

    /// A parameter was declared without a type.
    #[error("parameter '{parameter}' of capability '{capability}' has no declared type")]
    MissingType {
        capability: String,
        parameter: String,
    },

    /// A parameter type is not one of the primitive tags.
    #[error(
        "parameter '{parameter}' of capability '{capability}' has unsupported type '{type_tag}' \
         (expected int, str, bool or float)"
    )]
    UnsupportedType {
        capability: String,
        parameter: String,
        type_tag: String,
    },

    /// Two parameters share a name.
    #[error("capability '{capability}' declares parameter '{parameter}' twice")]
    DuplicateParameter {
        capability: String,
        parameter: String,
    },

    /// A default value does not fit the declared parameter type.
    #[error("default for parameter '{parameter}' of capability '{capability}' is not a valid {expected}")]
    InvalidDefault {
        capability: String,
        parameter: String,
        expected: String,
    },

    /// A signature document could not be read.
    #[error("malformed capability signature: {0}")]
    MalformedSignature(String),

    /// Two capabilities with the same name were bound to one set.
    #[error("capability '{0}' is already bound")]
    DuplicateCapability(String),
}

/// A single capability call failed. Surfaced as observation text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// The call segment is not a valid `{"name", "arguments", "id"}` object.
    #[error("malformed tool call: {0}")]
    Malformed(String),

    /// Another call in the same turn already used this id.
    #[error("duplicate call id {0} in one turn")]
    DuplicateCallId(i64),

    /// The model asked for a capability that is not bound.
    #[error("unknown capability: {0}")]
    UnknownCapability(String),

    /// An argument name is absent from the capability schema.
    #[error("unknown argument '{argument}' for capability '{capability}'")]
    UnknownArgument {
        capability: String,
        argument: String,
    },

    /// An argument value cannot be coerced to the declared type.
    #[error("argument '{argument}' for capability '{capability}' expects {expected}, got {value}")]
    ArgumentType {
        capability: String,
        argument: String,
        expected: String,
        value: String,
    },

    /// A required parameter was not supplied.
    #[error("missing required argument '{argument}' for capability '{capability}'")]
    MissingArgument {
        capability: String,
        argument: String,
    },

    /// The capability itself failed.
    #[error("capability '{capability}' failed: {message}")]
    Execution { capability: String, message: String },

    /// The capability did not finish in time.
    #[error("capability '{capability}' timed out after {secs}s")]
    Timeout { capability: String, secs: u64 },
}

/// The reasoning engine could not produce a completion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The provider returned an error.
    #[error("completion provider error: {0}")]
    Provider(String),

    /// A completion did not finish in time.
    #[error("completion timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Every retry attempt failed.
    #[error("completion failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

/// Raised (and recovered) when the loop runs out of iterations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("iteration budget of {max_iterations} exhausted without a final response")]
pub struct IterationBudgetExceeded {
    pub max_iterations: u32,
}

/// Invalid graph construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The edge would create a dependency cycle.
    #[error("edge '{from}' -> '{to}' would create a dependency cycle")]
    Cycle { from: String, to: String },

    /// A node id does not belong to this crew.
    #[error("unknown node id {0}")]
    UnknownNode(usize),
}

/// A prompt template failed to render.
#[derive(Debug, Error)]
#[error("prompt template error: {0}")]
pub struct TemplateError(#[from] pub tera::Error);

/// A single agent run failed.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The agent already produced its output in this run.
    #[error("agent '{0}' already produced its output")]
    AlreadyRan(String),
}

/// A crew run failed.
#[derive(Debug, Error)]
pub enum CrewError {
    /// A node failed; the run stops.
    #[error("agent '{agent}' failed: {source}")]
    Agent {
        agent: String,
        #[source]
        source: AgentError,
    },

    #[error("crew has no agents to run")]
    Empty,
}

/// Configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config value for '{key}': {message}")]
    Invalid { key: String, message: String },
}
