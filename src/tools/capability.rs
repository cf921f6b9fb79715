//! Capabilities: named, typed operations the reasoning engine may call.
//!
//! A `Capability` is registered once through [`CapabilityBuilder`] (or from
//! a JSON signature document) and is immutable afterwards. Its parameter
//! list is the only source of truth for argument coercion.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::tool_calling::CapabilityCall;
use crate::utilities::errors::{BoxError, CallError, SchemaError};

/// Validated keyword arguments passed to a handler.
pub type Arguments = HashMap<String, Value>;

/// Synchronous handler. Runs on the blocking thread pool.
pub type BlockingFn = Arc<dyn Fn(Arguments) -> Result<Value, BoxError> + Send + Sync>;

/// Future returned by an async handler.
pub type CapabilityFuture = BoxFuture<'static, Result<Value, BoxError>>;

/// Asynchronous handler.
pub type AsyncFn = Arc<dyn Fn(Arguments) -> CapabilityFuture + Send + Sync>;

/// The callable behind a capability.
#[derive(Clone)]
pub enum Handler {
    Blocking(BlockingFn),
    Async(AsyncFn),
}

impl Handler {
    /// Wrap a blocking function.
    pub fn blocking<F>(f: F) -> Self
    where
        F: Fn(Arguments) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Handler::Blocking(Arc::new(f))
    }

    /// Wrap an async function.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        Handler::Async(Arc::new(move |args| -> CapabilityFuture { Box::pin(f(args)) }))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Blocking(_) => write!(f, "Handler::Blocking"),
            Handler::Async(_) => write!(f, "Handler::Async"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parameter types
// ---------------------------------------------------------------------------

/// Primitive parameter type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Int,
    Str,
    Bool,
    Float,
}

impl ParamType {
    /// Parse a type tag. Accepts the short and long spellings.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => Some(Self::Int),
            "str" | "string" => Some(Self::Str),
            "bool" | "boolean" => Some(Self::Bool),
            "float" | "number" => Some(Self::Float),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Str => "str",
            Self::Bool => "bool",
            Self::Float => "float",
        }
    }

    /// Whether `value` already has this type.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Int, Value::Number(n)) => n.is_i64(),
            (Self::Float, Value::Number(n)) => n.is_f64(),
            (Self::Str, Value::String(_)) => true,
            (Self::Bool, Value::Bool(_)) => true,
            _ => false,
        }
    }

    /// Constructor-style conversion (`int("5")`, `float(3)`, ...).
    ///
    /// Returns `None` when the value is not representable in this type.
    pub fn coerce(&self, value: &Value) -> Option<Value> {
        if self.matches(value) {
            return Some(value.clone());
        }
        match self {
            Self::Int => match value {
                Value::Number(n) => {
                    let f = n.as_f64()?;
                    if f.is_finite() && f.abs() < i64::MAX as f64 {
                        Some(Value::from(f.trunc() as i64))
                    } else {
                        None
                    }
                }
                Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
                Value::Bool(b) => Some(Value::from(i64::from(*b))),
                _ => None,
            },
            Self::Float => {
                let f = match value {
                    Value::Number(n) => n.as_f64()?,
                    Value::String(s) => s.trim().parse::<f64>().ok()?,
                    Value::Bool(b) => f64::from(u8::from(*b)),
                    _ => return None,
                };
                serde_json::Number::from_f64(f).map(Value::Number)
            }
            Self::Str => match value {
                Value::Null => None,
                Value::Number(n) => Some(Value::String(n.to_string())),
                Value::Bool(b) => Some(Value::String(b.to_string())),
                other => Some(Value::String(other.to_string())),
            },
            Self::Bool => match value {
                Value::Number(n) => Some(Value::Bool(n.as_f64()? != 0.0)),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" | "on" => Some(Value::Bool(true)),
                    "false" | "0" | "no" | "off" => Some(Value::Bool(false)),
                    _ => None,
                },
                _ => None,
            },
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
    pub required: bool,
    /// Value used when an optional parameter is not supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// A registered capability. Cheap to clone; the handler is shared.
#[derive(Clone)]
pub struct Capability {
    name: String,
    description: String,
    parameters: Vec<Parameter>,
    handler: Handler,
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("handler", &self.handler)
            .finish()
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}

impl Capability {
    /// Start declaring a capability.
    pub fn builder(name: impl Into<String>) -> CapabilityBuilder {
        CapabilityBuilder {
            name: name.into(),
            description: String::new(),
            params: Vec::new(),
        }
    }

    /// Register from a signature document:
    ///
    /// ```json
    /// {"name": "get_weather", "description": "...",
    ///  "parameters": {"properties": {"location": {"type": "str"}}, "required": ["location"]}}
    /// ```
    ///
    /// When `required` is absent every property without a `default` is
    /// required.
    pub fn from_signature(signature: &Value, handler: Handler) -> Result<Self, SchemaError> {
        let name = signature
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| SchemaError::MalformedSignature("missing 'name'".to_string()))?;
        let description = signature
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let mut builder = Capability::builder(name).description(description);

        let parameters = signature.get("parameters");
        let properties = match parameters.and_then(|p| p.get("properties")) {
            None | Some(Value::Null) => serde_json::Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return Err(SchemaError::MalformedSignature(
                    "'parameters.properties' must be an object".to_string(),
                ))
            }
        };
        let required: Option<Vec<&str>> = parameters
            .and_then(|p| p.get("required"))
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Value::as_str).collect());

        for (param, spec) in &properties {
            let type_tag = spec.get("type").and_then(Value::as_str).unwrap_or_default();
            let default = spec.get("default").cloned();
            let is_required = match &required {
                Some(list) => list.contains(&param.as_str()),
                None => default.is_none(),
            };
            builder.params.push(ParamDecl {
                name: param.clone(),
                type_tag: type_tag.to_string(),
                required: is_required,
                default,
            });
        }

        builder.build(handler)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared parameters in declaration order.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// The signature given to the reasoning engine.
    pub fn signature(&self) -> Value {
        let mut properties = serde_json::Map::new();
        for param in &self.parameters {
            let mut spec = json!({ "type": param.ty.as_str() });
            if let Some(default) = &param.default {
                spec["default"] = default.clone();
            }
            properties.insert(param.name.clone(), spec);
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();
        json!({
            "name": self.name,
            "description": self.description,
            "parameters": {
                "properties": properties,
                "required": required,
            }
        })
    }

    /// Check every argument of `call` against the schema and coerce values
    /// to the declared types. Optional parameters that are absent (or null)
    /// take their default.
    pub fn validate_and_coerce(&self, call: CapabilityCall) -> Result<CapabilityCall, CallError> {
        let CapabilityCall { name, arguments, id } = call;
        let mut coerced = Arguments::with_capacity(self.parameters.len());

        for (arg_name, value) in arguments {
            let param = self
                .parameter(&arg_name)
                .ok_or_else(|| CallError::UnknownArgument {
                    capability: self.name.clone(),
                    argument: arg_name.clone(),
                })?;
            if value.is_null() && !param.required {
                continue;
            }
            let converted = param.ty.coerce(&value).ok_or_else(|| CallError::ArgumentType {
                capability: self.name.clone(),
                argument: arg_name.clone(),
                expected: param.ty.to_string(),
                value: value.to_string(),
            })?;
            coerced.insert(arg_name, converted);
        }

        for param in &self.parameters {
            if coerced.contains_key(&param.name) {
                continue;
            }
            match (&param.default, param.required) {
                (Some(default), _) => {
                    coerced.insert(param.name.clone(), default.clone());
                }
                (None, true) => {
                    return Err(CallError::MissingArgument {
                        capability: self.name.clone(),
                        argument: param.name.clone(),
                    })
                }
                (None, false) => {}
            }
        }

        Ok(CapabilityCall {
            name,
            arguments: coerced,
            id,
        })
    }

    /// Run the handler with already validated arguments.
    ///
    /// Handler errors become `CallError::Execution`; exceeding `timeout`
    /// becomes `CallError::Timeout`. Nothing is retried. A blocking handler
    /// that times out keeps running on its pool thread; its result is
    /// discarded.
    pub async fn invoke(&self, arguments: Arguments, timeout: Duration) -> Result<Value, CallError> {
        let run: CapabilityFuture = match &self.handler {
            Handler::Blocking(f) => {
                let f = Arc::clone(f);
                Box::pin(async move {
                    match tokio::task::spawn_blocking(move || f(arguments)).await {
                        Ok(result) => result,
                        Err(join_error) => Err(format!("handler panicked: {}", join_error).into()),
                    }
                })
            }
            Handler::Async(f) => f(arguments),
        };

        match tokio::time::timeout(timeout, run).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CallError::Execution {
                capability: self.name.clone(),
                message: e.to_string(),
            }),
            Err(_) => Err(CallError::Timeout {
                capability: self.name.clone(),
                secs: timeout.as_secs(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ParamDecl {
    name: String,
    type_tag: String,
    required: bool,
    default: Option<Value>,
}

/// Declares a capability. Validation happens in [`CapabilityBuilder::build`].
#[derive(Debug, Clone)]
pub struct CapabilityBuilder {
    name: String,
    description: String,
    params: Vec<ParamDecl>,
}

impl CapabilityBuilder {
    /// Documentation shown to the reasoning engine.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// A required parameter with the given type tag.
    pub fn param(mut self, name: impl Into<String>, type_tag: impl Into<String>) -> Self {
        self.params.push(ParamDecl {
            name: name.into(),
            type_tag: type_tag.into(),
            required: true,
            default: None,
        });
        self
    }

    /// An optional parameter filled with `default` when absent.
    pub fn optional_param(
        mut self,
        name: impl Into<String>,
        type_tag: impl Into<String>,
        default: Value,
    ) -> Self {
        self.params.push(ParamDecl {
            name: name.into(),
            type_tag: type_tag.into(),
            required: false,
            default: Some(default),
        });
        self
    }

    /// Finish registration with the callable.
    pub fn build(self, handler: Handler) -> Result<Capability, SchemaError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(SchemaError::EmptyName);
        }

        let mut parameters: Vec<Parameter> = Vec::with_capacity(self.params.len());
        for decl in self.params {
            if parameters.iter().any(|p| p.name == decl.name) {
                return Err(SchemaError::DuplicateParameter {
                    capability: name,
                    parameter: decl.name,
                });
            }
            if decl.type_tag.trim().is_empty() {
                return Err(SchemaError::MissingType {
                    capability: name,
                    parameter: decl.name,
                });
            }
            let ty = ParamType::parse(&decl.type_tag).ok_or_else(|| SchemaError::UnsupportedType {
                capability: name.clone(),
                parameter: decl.name.clone(),
                type_tag: decl.type_tag.clone(),
            })?;
            let default = match decl.default {
                Some(value) => Some(ty.coerce(&value).ok_or_else(|| SchemaError::InvalidDefault {
                    capability: name.clone(),
                    parameter: decl.name.clone(),
                    expected: ty.to_string(),
                })?),
                None => None,
            };
            parameters.push(Parameter {
                name: decl.name,
                ty,
                required: decl.required,
                default,
            });
        }

        log::debug!("Registered capability '{}' ({} parameters)", name, parameters.len());

        Ok(Capability {
            name,
            description: self.description,
            parameters,
            handler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo() -> Handler {
        Handler::blocking(|args| Ok(json!(args)))
    }

    fn adder() -> Capability {
        Capability::builder("add")
            .description("Add two integers.")
            .param("a", "int")
            .optional_param("b", "int", json!(1))
            .build(Handler::blocking(|args| {
                let a = args["a"].as_i64().unwrap_or_default();
                let b = args["b"].as_i64().unwrap_or_default();
                Ok(json!(a + b))
            }))
            .unwrap()
    }

    fn call(arguments: Value) -> CapabilityCall {
        CapabilityCall {
            name: "add".to_string(),
            arguments: serde_json::from_value(arguments).unwrap(),
            id: 0,
        }
    }

    #[test]
    fn test_string_coerced_to_int() {
        let validated = adder().validate_and_coerce(call(json!({"a": "5"}))).unwrap();
        assert_eq!(validated.arguments["a"], json!(5));
        assert_eq!(validated.arguments["b"], json!(1));
    }

    #[test]
    fn test_unrepresentable_int_is_argument_type_error() {
        let err = adder().validate_and_coerce(call(json!({"a": "abc"}))).unwrap_err();
        assert!(matches!(err, CallError::ArgumentType { ref argument, .. } if argument == "a"));
    }

    #[test]
    fn test_unknown_argument() {
        let err = adder()
            .validate_and_coerce(call(json!({"a": 1, "c": 2})))
            .unwrap_err();
        assert!(matches!(err, CallError::UnknownArgument { ref argument, .. } if argument == "c"));
    }

    #[test]
    fn test_missing_required_argument() {
        let err = adder().validate_and_coerce(call(json!({"b": 2}))).unwrap_err();
        assert!(matches!(err, CallError::MissingArgument { ref argument, .. } if argument == "a"));
    }

    #[test]
    fn test_primitive_coercions() {
        assert_eq!(ParamType::Float.coerce(&json!("2.5")), Some(json!(2.5)));
        assert_eq!(ParamType::Float.coerce(&json!(3)), Some(json!(3.0)));
        assert_eq!(ParamType::Int.coerce(&json!(7.9)), Some(json!(7)));
        assert_eq!(ParamType::Str.coerce(&json!(42)), Some(json!("42")));
        assert_eq!(ParamType::Bool.coerce(&json!("False")), Some(json!(false)));
        assert_eq!(ParamType::Bool.coerce(&json!("maybe")), None);
        assert_eq!(ParamType::Str.coerce(&Value::Null), None);
    }

    #[test]
    fn test_schema_error_on_missing_type() {
        let err = Capability::builder("broken")
            .param("x", "")
            .build(echo())
            .unwrap_err();
        assert!(matches!(err, SchemaError::MissingType { .. }));
    }

    #[test]
    fn test_schema_error_on_unsupported_type() {
        let err = Capability::builder("broken")
            .param("when", "datetime")
            .build(echo())
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedType { ref type_tag, .. } if type_tag == "datetime"));
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let err = Capability::builder("twice")
            .param("x", "int")
            .param("x", "str")
            .build(echo())
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateParameter { .. }));
    }

    #[test]
    fn test_from_signature() {
        let signature = json!({
            "name": "get_weather",
            "description": "Current temperature.",
            "parameters": {"properties": {
                "location": {"type": "str"},
                "unit": {"type": "str", "default": "celsius"}
            }}
        });
        let capability = Capability::from_signature(&signature, echo()).unwrap();
        assert_eq!(capability.name(), "get_weather");
        assert!(capability.parameter("location").unwrap().required);
        assert!(!capability.parameter("unit").unwrap().required);
        assert_eq!(capability.signature()["parameters"]["required"], json!(["location"]));
    }

    #[test]
    fn test_from_signature_without_type_fails() {
        let signature = json!({
            "name": "f",
            "parameters": {"properties": {"x": {}}}
        });
        let err = Capability::from_signature(&signature, echo()).unwrap_err();
        assert!(matches!(err, SchemaError::MissingType { .. }));
    }

    #[tokio::test]
    async fn test_invoke_blocking_handler() {
        let capability = adder();
        let validated = capability.validate_and_coerce(call(json!({"a": "2", "b": 3}))).unwrap();
        let result = capability
            .invoke(validated.arguments, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(result, json!(5));
    }

    #[tokio::test]
    async fn test_handler_error_is_execution_error() {
        let capability = Capability::builder("fail")
            .build(Handler::blocking(|_| Err("mailbox unavailable".into())))
            .unwrap();
        let err = capability
            .invoke(Arguments::new(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CallError::Execution {
                capability: "fail".to_string(),
                message: "mailbox unavailable".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_async_handler_timeout() {
        let capability = Capability::builder("slow")
            .build(Handler::from_async(|_| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, BoxError>(Value::Null)
            }))
            .unwrap();
        let err = capability
            .invoke(Arguments::new(), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Timeout { .. }));
    }
}
