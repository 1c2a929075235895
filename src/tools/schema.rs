//! Tool parameter schemas
//!
//! Declarative parameter descriptions for registered tools. A descriptor's
//! parameter list is turned into a JSON Schema once at registration time,
//! and incoming arguments are validated against it before the handler is
//! ever called. There is no runtime type introspection: everything a tool
//! accepts is declared up front.

use super::InvokeError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Semantic parameter type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Boolean,
    /// String constrained to a fixed set of literals
    Enum(Vec<String>),
}

impl ParamType {
    fn json_type(&self) -> &'static str {
        match self {
            ParamType::String | ParamType::Enum(_) => "string",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
        }
    }
}

/// One declared tool parameter
///
/// An optional-of-T parameter is a non-required entry of type T. Declared
/// defaults are filled in for absent optional parameters before the
/// handler runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolParam {
    pub name: String,
    pub param_type: ParamType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ToolParam {
    fn new(name: &str, param_type: ParamType) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: None,
            required: true,
            default: None,
        }
    }

    /// A required string parameter
    pub fn string(name: &str) -> Self {
        Self::new(name, ParamType::String)
    }

    /// A required number parameter
    pub fn number(name: &str) -> Self {
        Self::new(name, ParamType::Number)
    }

    /// A required boolean parameter
    pub fn boolean(name: &str) -> Self {
        Self::new(name, ParamType::Boolean)
    }

    /// A required string parameter constrained to the given literals
    pub fn one_of<I, S>(name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            ParamType::Enum(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Mark the parameter optional
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Attach a human-readable description
    pub fn describe(mut self, text: &str) -> Self {
        self.description = Some(text.to_string());
        self
    }

    /// Attach a default value. A parameter with a default is optional.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self.required = false;
        self
    }
}

/// Derive the JSON Schema object for a parameter list.
///
/// Properties appear in declaration order, each exactly once.
pub fn json_schema(params: &[ToolParam]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in params {
        let mut prop = Map::new();
        prop.insert("type".to_string(), json!(param.param_type.json_type()));
        if let ParamType::Enum(values) = &param.param_type {
            prop.insert("enum".to_string(), json!(values));
        }
        if let Some(desc) = &param.description {
            prop.insert("description".to_string(), json!(desc));
        }
        if let Some(default) = &param.default {
            prop.insert("default".to_string(), default.clone());
        }
        properties.insert(param.name.clone(), Value::Object(prop));
        if param.required {
            required.push(param.name.clone());
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Check descriptor invariants at registration time.
///
/// Rejects duplicate parameter names and defaults that violate the
/// declared type or enum constraint.
pub(crate) fn validate_descriptor(params: &[ToolParam]) -> Result<(), String> {
    let mut seen = std::collections::HashSet::new();
    for param in params {
        if !seen.insert(param.name.as_str()) {
            return Err(format!("duplicate parameter '{}'", param.name));
        }
        if let Some(default) = &param.default {
            if !type_matches(&param.param_type, default) {
                return Err(format!(
                    "default for '{}' does not match declared type",
                    param.name
                ));
            }
            if let ParamType::Enum(allowed) = &param.param_type {
                let value = default.as_str().unwrap_or_default();
                if !allowed.iter().any(|a| a == value) {
                    return Err(format!(
                        "default '{}' for '{}' is outside the allowed set",
                        value, param.name
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Validate incoming arguments against a parameter list.
///
/// Rejects unknown keys, missing required parameters, type mismatches,
/// and enum values outside the allowed set. Fills declared defaults for
/// absent optional parameters. Only a map that passed validation ever
/// reaches a handler.
pub(crate) fn validate_args(
    params: &[ToolParam],
    arguments: Option<&Value>,
) -> Result<Map<String, Value>, InvokeError> {
    let empty = Map::new();
    let args = match arguments {
        None | Some(Value::Null) => &empty,
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(InvokeError::TypeMismatch {
                name: "arguments".to_string(),
                expected: "object",
            })
        }
    };

    for key in args.keys() {
        if !params.iter().any(|p| &p.name == key) {
            return Err(InvokeError::UnknownParameter(key.clone()));
        }
    }

    let mut validated = Map::new();
    for param in params {
        match args.get(&param.name) {
            Some(value) => {
                if !type_matches(&param.param_type, value) {
                    return Err(InvokeError::TypeMismatch {
                        name: param.name.clone(),
                        expected: param.param_type.json_type(),
                    });
                }
                if let ParamType::Enum(allowed) = &param.param_type {
                    // type check above guarantees a string
                    let s = value.as_str().unwrap_or_default();
                    if !allowed.iter().any(|a| a == s) {
                        return Err(InvokeError::InvalidEnumValue {
                            name: param.name.clone(),
                            value: s.to_string(),
                            allowed: allowed.clone(),
                        });
                    }
                }
                validated.insert(param.name.clone(), value.clone());
            }
            None if param.required => {
                return Err(InvokeError::MissingParameter(param.name.clone()));
            }
            None => {
                if let Some(default) = &param.default {
                    validated.insert(param.name.clone(), default.clone());
                }
                // No default: the handler sees the parameter as absent
            }
        }
    }

    Ok(validated)
}

fn type_matches(param_type: &ParamType, value: &Value) -> bool {
    match param_type {
        ParamType::String | ParamType::Enum(_) => value.is_string(),
        ParamType::Number => value.is_number(),
        ParamType::Boolean => value.is_boolean(),
    }
}
