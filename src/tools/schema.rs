//! Argument schema checks
//!
//! Declarations are checked once when the catalog is built. Model-supplied
//! arguments are checked on every call, before any adapter runs.

use super::{ToolDeclaration, ToolParameter};
use crate::error::{AdapterError, CatalogError};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
}

impl ParamType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "string" => Some(ParamType::String),
            "number" => Some(ParamType::Number),
            "integer" => Some(ParamType::Integer),
            "boolean" => Some(ParamType::Boolean),
            _ => None,
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Boolean => value.is_boolean(),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// Reject declarations that could never validate consistently
pub fn check_declaration(declaration: &ToolDeclaration) -> Result<(), CatalogError> {
    let invalid = |reason: String| CatalogError::InvalidSchema {
        tool: declaration.name.clone(),
        reason,
    };

    if declaration.name.trim().is_empty() {
        return Err(invalid("tool name is empty".to_string()));
    }

    let mut seen = HashSet::new();
    for param in &declaration.parameters {
        if param.name.trim().is_empty() {
            return Err(invalid("parameter with empty name".to_string()));
        }
        if !seen.insert(param.name.as_str()) {
            return Err(invalid(format!("parameter '{}' declared twice", param.name)));
        }
        let param_type = ParamType::parse(&param.param_type).ok_or_else(|| {
            invalid(format!(
                "parameter '{}' has no valid type (got '{}')",
                param.name, param.param_type
            ))
        })?;
        if !param.allowed.is_empty() && param_type != ParamType::String {
            return Err(invalid(format!(
                "parameter '{}' restricts values but is not a string",
                param.name
            )));
        }
    }

    Ok(())
}

/// Validate raw model arguments against a declaration.
///
/// On failure the message names every offending field.
pub fn validate(declaration: &ToolDeclaration, raw: &Value) -> Result<ValidatedArgs, String> {
    let fields = match raw {
        Value::Object(map) => map.clone(),
        // Some models send `null` or nothing for zero-argument tools
        Value::Null => Map::new(),
        other => {
            return Err(format!(
                "arguments must be a JSON object, got {}",
                json_type_name(other)
            ))
        }
    };

    let mut problems = Vec::new();
    for param in &declaration.parameters {
        match fields.get(&param.name) {
            None | Some(Value::Null) => {
                if param.required {
                    problems.push(format!("missing required field '{}'", param.name));
                }
            }
            Some(value) => {
                if let Some(problem) = check_value(param, value) {
                    problems.push(problem);
                }
            }
        }
    }

    for key in fields.keys() {
        if !declaration.parameters.iter().any(|p| &p.name == key) {
            tracing::debug!("Ignoring undeclared argument '{}' for '{}'", key, declaration.name);
        }
    }

    if problems.is_empty() {
        Ok(ValidatedArgs { fields })
    } else {
        Err(problems.join("; "))
    }
}

fn check_value(param: &ToolParameter, value: &Value) -> Option<String> {
    // check_declaration guarantees the type parses
    let expected = ParamType::parse(&param.param_type)?;
    if !expected.matches(value) {
        return Some(format!(
            "field '{}' expected {}, got {}",
            param.name,
            expected,
            json_type_name(value)
        ));
    }
    if let (false, Some(s)) = (param.allowed.is_empty(), value.as_str()) {
        if !param.allowed.iter().any(|a| a == s) {
            return Some(format!(
                "field '{}' must be one of [{}], got '{}'",
                param.name,
                param.allowed.join(", "),
                s
            ));
        }
    }
    None
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Arguments that passed schema validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedArgs {
    fields: Map<String, Value>,
}

impl ValidatedArgs {
    /// Deserialize into the adapter's typed argument struct
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, AdapterError> {
        serde_json::from_value(Value::Object(self.fields.clone()))
            .map_err(|e| AdapterError::InvalidInput(e.to_string()))
    }
}
