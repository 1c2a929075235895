//! Locally-registered tools
//!
//! Tools are named, schema-described functions the remote agent runtime
//! may invoke mid-session. Each registered tool pairs a declarative
//! parameter schema with a handler; the registry validates incoming
//! arguments against the schema before the handler runs, and converts any
//! handler failure into a structured error instead of letting it reach
//! the dispatch loop.
//!
//! ```rust
//! use agent_session::tools::{ToolDescriptor, ToolParam};
//! use serde_json::json;
//!
//! let add = ToolDescriptor::from_fn(
//!     "add",
//!     "Add two numbers",
//!     vec![ToolParam::number("first"), ToolParam::number("second")],
//!     |args| async move {
//!         let sum = args["first"].as_f64().unwrap_or(0.0)
//!             + args["second"].as_f64().unwrap_or(0.0);
//!         Ok(json!(sum))
//!     },
//! );
//! ```

use crate::protocol::{JsonRpcError, INVALID_PARAMS, METHOD_NOT_FOUND, TOOL_ERROR};
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

mod registry;
pub mod schema;

pub use registry::ToolRegistry;
pub use schema::{json_schema, ParamType, ToolParam};

/// Tool invocation failure
///
/// Validation variants are returned to the far end as structured error
/// responses; they are never thrown at the local caller.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Type mismatch for parameter '{name}': expected {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    #[error("Invalid value for parameter '{name}': '{value}' is not one of {allowed:?}")]
    InvalidEnumValue {
        name: String,
        value: String,
        allowed: Vec<String>,
    },

    /// The handler itself failed; contained at the invocation boundary
    #[error("Tool execution failed: {0}")]
    Handler(String),
}

impl InvokeError {
    /// Map onto the JSON-RPC error object sent back to the far end
    pub fn to_json_rpc(&self) -> JsonRpcError {
        let code = match self {
            InvokeError::UnknownTool(_) => METHOD_NOT_FOUND,
            InvokeError::Handler(_) => TOOL_ERROR,
            _ => INVALID_PARAMS,
        };
        JsonRpcError::new(code, self.to_string())
    }
}

/// Handler trait — the callable behind one registered tool
///
/// `args` has already been validated against the tool's schema and had
/// declared defaults filled in.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: Map<String, Value>) -> anyhow::Result<Value>;
}

/// Serializable tool definition advertised to the far end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// One registrable tool: name, description, parameter schema, handler
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub params: Vec<ToolParam>,
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    pub fn new(
        name: &str,
        description: &str,
        params: Vec<ToolParam>,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            params,
            handler,
        }
    }

    /// Build a descriptor from an async closure
    pub fn from_fn<F, Fut>(name: &str, description: &str, params: Vec<ToolParam>, f: F) -> Self
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self::new(
            name,
            description,
            params,
            Arc::new(FnHandler {
                f: Box::new(move |args| Box::pin(f(args))),
            }),
        )
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

type BoxedToolFn =
    Box<dyn Fn(Map<String, Value>) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

struct FnHandler {
    f: BoxedToolFn,
}

#[async_trait]
impl ToolHandler for FnHandler {
    async fn call(&self, args: Map<String, Value>) -> anyhow::Result<Value> {
        (self.f)(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_from_fn_handler() {
        let tool = ToolDescriptor::from_fn("echo", "Echo input", vec![], |args| async move {
            Ok(Value::Object(args))
        });
        let mut args = Map::new();
        args.insert("x".to_string(), json!(1));
        let result = tool.handler.call(args).await.unwrap();
        assert_eq!(result, json!({"x": 1}));
    }

    #[test]
    fn test_invoke_error_codes() {
        assert_eq!(
            InvokeError::UnknownTool("x".into()).to_json_rpc().code,
            METHOD_NOT_FOUND
        );
        assert_eq!(
            InvokeError::MissingParameter("x".into()).to_json_rpc().code,
            INVALID_PARAMS
        );
        assert_eq!(
            InvokeError::Handler("boom".into()).to_json_rpc().code,
            TOOL_ERROR
        );
    }

    #[test]
    fn test_tool_definition_serde_camel_case() {
        let def = ToolDefinition {
            name: "add".to_string(),
            description: "Add".to_string(),
            input_schema: json!({"type": "object"}),
        };
        let json = serde_json::to_string(&def).unwrap();
        assert!(json.contains("inputSchema"));
    }

    #[test]
    fn test_descriptor_debug_omits_handler() {
        let tool = ToolDescriptor::from_fn("t", "d", vec![], |_| async { Ok(json!(null)) });
        let debug = format!("{:?}", tool);
        assert!(debug.contains("\"t\""));
        assert!(!debug.contains("handler"));
    }
}
