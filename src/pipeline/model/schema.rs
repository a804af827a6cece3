//! Response-shape contracts for model output.
//!
//! A `Schema` is rendered into Gemini's `responseSchema` so the model is
//! constrained at generation time, and checked again locally with
//! `Schema::validate` because the constraint is best-effort on the API side.
//! Validation is pure and runs against hand-written fixtures in tests.

use serde_json::{json, Map, Value};
use thiserror::Error;

/// Field and type contract for a JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    String,
    /// String restricted to a fixed set of values.
    Enum(Vec<String>),
    Array(Box<Schema>),
    Object(Vec<Property>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub schema: Schema,
    pub required: bool,
}

/// Response JSON that parses but breaks the declared contract.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{path}: {expected}")]
pub struct SchemaViolation {
    /// JSON path of the offending value, e.g. `$.sections[1].icon`.
    pub path: String,
    pub expected: String,
}

impl SchemaViolation {
    pub fn new(path: &str, expected: &str) -> Self {
        Self {
            path: path.to_string(),
            expected: expected.to_string(),
        }
    }
}

impl Schema {
    /// Object schema from `(name, schema, required)` triples, order kept.
    pub fn object(fields: Vec<(&str, Schema, bool)>) -> Self {
        Schema::Object(
            fields
                .into_iter()
                .map(|(name, schema, required)| Property {
                    name: name.to_string(),
                    schema,
                    required,
                })
                .collect(),
        )
    }

    pub fn array(items: Schema) -> Self {
        Schema::Array(Box::new(items))
    }

    pub fn enumeration(values: &[&str]) -> Self {
        Schema::Enum(values.iter().map(|v| v.to_string()).collect())
    }

    /// Render as Gemini's OpenAPI-subset schema.
    pub fn to_gemini(&self) -> Value {
        match self {
            Schema::String => json!({ "type": "STRING" }),
            Schema::Enum(values) => json!({ "type": "STRING", "enum": values }),
            Schema::Array(items) => json!({ "type": "ARRAY", "items": items.to_gemini() }),
            Schema::Object(props) => {
                let mut properties = Map::new();
                for prop in props {
                    properties.insert(prop.name.clone(), prop.schema.to_gemini());
                }
                let required: Vec<&str> = props
                    .iter()
                    .filter(|p| p.required)
                    .map(|p| p.name.as_str())
                    .collect();
                let ordering: Vec<&str> = props.iter().map(|p| p.name.as_str()).collect();
                json!({
                    "type": "OBJECT",
                    "properties": properties,
                    "required": required,
                    "propertyOrdering": ordering,
                })
            }
        }
    }

    /// Check `value` against this schema. Extra object fields are tolerated.
    pub fn validate(&self, value: &Value) -> Result<(), SchemaViolation> {
        self.validate_at(value, "$")
    }

    fn validate_at(&self, value: &Value, path: &str) -> Result<(), SchemaViolation> {
        match self {
            Schema::String => match value {
                Value::String(_) => Ok(()),
                other => Err(SchemaViolation::new(
                    path,
                    &format!("expected string, found {}", kind_of(other)),
                )),
            },
            Schema::Enum(allowed) => match value {
                Value::String(s) if allowed.iter().any(|a| a == s) => Ok(()),
                Value::String(s) => Err(SchemaViolation::new(
                    path,
                    &format!("expected one of [{}], found \"{s}\"", allowed.join(", ")),
                )),
                other => Err(SchemaViolation::new(
                    path,
                    &format!("expected string, found {}", kind_of(other)),
                )),
            },
            Schema::Array(items) => match value {
                Value::Array(elements) => {
                    for (i, element) in elements.iter().enumerate() {
                        items.validate_at(element, &format!("{path}[{i}]"))?;
                    }
                    Ok(())
                }
                other => Err(SchemaViolation::new(
                    path,
                    &format!("expected array, found {}", kind_of(other)),
                )),
            },
            Schema::Object(props) => {
                let obj = match value {
                    Value::Object(obj) => obj,
                    other => {
                        return Err(SchemaViolation::new(
                            path,
                            &format!("expected object, found {}", kind_of(other)),
                        ))
                    }
                };
                for prop in props {
                    let child_path = format!("{path}.{}", prop.name);
                    match obj.get(&prop.name) {
                        None | Some(Value::Null) if prop.required => {
                            return Err(SchemaViolation::new(&child_path, "required field is missing"));
                        }
                        None | Some(Value::Null) => {}
                        Some(child) => prop.schema.validate_at(child, &child_path)?,
                    }
                }
                Ok(())
            }
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
