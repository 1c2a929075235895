//! Tool Registry
//!
//! Thread-safe map from tool name to descriptor plus the schema derived
//! at registration time. Invocation is validate-before-call: arguments
//! are checked against the stored schema and only a validated map ever
//! reaches the handler.

use super::{schema, InvokeError, ToolDefinition, ToolDescriptor};
use crate::error::{Result, SessionError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

struct RegisteredTool {
    descriptor: ToolDescriptor,
    /// JSON Schema derived once at registration
    input_schema: Value,
}

/// Registry of locally-registered tools for one session
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, RegisteredTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.
    ///
    /// Fails with `DuplicateToolName` if the name is taken and with
    /// `InvalidDescriptor` if the parameter list violates its own
    /// invariants (duplicate parameters, enum default outside the set).
    pub fn register(&self, descriptor: ToolDescriptor) -> Result<()> {
        schema::validate_descriptor(&descriptor.params).map_err(|reason| {
            SessionError::InvalidDescriptor {
                tool: descriptor.name.clone(),
                reason,
            }
        })?;

        let mut tools = self.tools.write().unwrap();
        if tools.contains_key(&descriptor.name) {
            return Err(SessionError::DuplicateToolName(descriptor.name));
        }

        tracing::debug!("Registering tool: {}", descriptor.name);
        let input_schema = schema::json_schema(&descriptor.params);
        tools.insert(
            descriptor.name.clone(),
            RegisteredTool {
                descriptor,
                input_schema,
            },
        );
        Ok(())
    }

    /// Check if a tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.tools.read().unwrap().contains_key(name)
    }

    /// List all registered tool names
    pub fn list(&self) -> Vec<String> {
        self.tools.read().unwrap().keys().cloned().collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tool definitions advertised to the far end during the handshake
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .read()
            .unwrap()
            .values()
            .map(|tool| ToolDefinition {
                name: tool.descriptor.name.clone(),
                description: tool.descriptor.description.clone(),
                input_schema: tool.input_schema.clone(),
            })
            .collect()
    }

    /// Invoke a tool with raw arguments from the wire.
    ///
    /// Validates before calling; a handler failure is caught here and
    /// converted into `InvokeError::Handler` so it can be sent back as a
    /// structured error response rather than tearing down the dispatch
    /// loop.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> std::result::Result<Value, InvokeError> {
        let descriptor = {
            let tools = self.tools.read().unwrap();
            match tools.get(name) {
                Some(tool) => tool.descriptor.clone(),
                None => return Err(InvokeError::UnknownTool(name.to_string())),
            }
        };

        let args = schema::validate_args(&descriptor.params, arguments.as_ref())?;

        descriptor.handler.call(args).await.map_err(|e| {
            tracing::warn!("Tool '{}' failed: {:#}", name, e);
            InvokeError::Handler(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolParam;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn add_tool() -> ToolDescriptor {
        ToolDescriptor::from_fn(
            "add",
            "Add two numbers",
            vec![ToolParam::number("first"), ToolParam::number("second")],
            |args| async move {
                let first = args["first"].as_f64().unwrap_or(0.0);
                let second = args["second"].as_f64().unwrap_or(0.0);
                Ok(json!(first + second))
            },
        )
    }

    #[test]
    fn test_register_and_contains() {
        let registry = ToolRegistry::new();
        registry.register(add_tool()).unwrap();
        assert!(registry.contains("add"));
        assert!(!registry.contains("subtract"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_duplicate_name_rejected() {
        let registry = ToolRegistry::new();
        registry.register(add_tool()).unwrap();
        let err = registry.register(add_tool()).unwrap_err();
        assert!(matches!(err, SessionError::DuplicateToolName(n) if n == "add"));
    }

    #[test]
    fn test_register_invalid_enum_default_rejected() {
        let registry = ToolRegistry::new();
        let tool = ToolDescriptor::from_fn(
            "bad",
            "Bad enum default",
            vec![ToolParam::one_of("mode", ["a", "b"]).default_value(json!("c"))],
            |_| async { Ok(json!(null)) },
        );
        let err = registry.register(tool).unwrap_err();
        assert!(matches!(err, SessionError::InvalidDescriptor { .. }));
    }

    #[test]
    fn test_definitions_carry_schema() {
        let registry = ToolRegistry::new();
        registry.register(add_tool()).unwrap();
        let defs = registry.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "add");
        assert_eq!(defs[0].input_schema["required"], json!(["first", "second"]));
    }

    #[tokio::test]
    async fn test_invoke_add() {
        let registry = ToolRegistry::new();
        registry.register(add_tool()).unwrap();
        let result = registry
            .invoke("add", Some(json!({"first": 2, "second": 3})))
            .await
            .unwrap();
        assert_eq!(result, json!(5.0));
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry.invoke("missing", None).await.unwrap_err();
        assert!(matches!(err, InvokeError::UnknownTool(n) if n == "missing"));
    }

    #[tokio::test]
    async fn test_invoke_missing_parameter_skips_handler() {
        let registry = ToolRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_handler = calls.clone();
        let tool = ToolDescriptor::from_fn(
            "counted",
            "Counts invocations",
            vec![ToolParam::string("needed")],
            move |_| {
                let calls = calls_in_handler.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!(null))
                }
            },
        );
        registry.register(tool).unwrap();

        let err = registry.invoke("counted", Some(json!({}))).await.unwrap_err();
        assert!(matches!(err, InvokeError::MissingParameter(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0, "handler must not run");
    }

    #[tokio::test]
    async fn test_invoke_optional_param_absent() {
        let registry = ToolRegistry::new();
        let tool = ToolDescriptor::from_fn(
            "greet",
            "Greet someone",
            vec![
                ToolParam::string("name"),
                ToolParam::string("title").optional(),
            ],
            |args| async move {
                let name = args["name"].as_str().unwrap_or_default();
                let greeting = match args.get("title").and_then(|t| t.as_str()) {
                    Some(title) => format!("Hello, {} {}", title, name),
                    None => format!("Hello, {}", name),
                };
                Ok(json!(greeting))
            },
        );
        registry.register(tool).unwrap();

        let result = registry
            .invoke("greet", Some(json!({"name": "Ada"})))
            .await
            .unwrap();
        assert_eq!(result, json!("Hello, Ada"));
    }

    #[tokio::test]
    async fn test_invoke_enum_value_outside_set() {
        let registry = ToolRegistry::new();
        let tool = ToolDescriptor::from_fn(
            "convert",
            "Convert temperature",
            vec![
                ToolParam::number("value"),
                ToolParam::one_of("unit", ["celsius", "fahrenheit"]),
            ],
            |_| async { Ok(json!(null)) },
        );
        registry.register(tool).unwrap();

        let err = registry
            .invoke("convert", Some(json!({"value": 1, "unit": "kelvin"})))
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::InvalidEnumValue { .. }));
    }

    #[tokio::test]
    async fn test_invoke_handler_error_contained() {
        let registry = ToolRegistry::new();
        let tool = ToolDescriptor::from_fn("explode", "Always fails", vec![], |_| async {
            anyhow::bail!("kaboom")
        });
        registry.register(tool).unwrap();

        let err = registry.invoke("explode", None).await.unwrap_err();
        match err {
            InvokeError::Handler(message) => assert!(message.contains("kaboom")),
            other => panic!("expected handler error, got {:?}", other),
        }
    }
}
