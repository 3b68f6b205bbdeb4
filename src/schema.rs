//! The recipe extraction schema and the typed values it describes.
//!
//! [`RecipeSchema`] holds the draft-07 "Recipe Information Extractor" JSON
//! Schema. It is built once per run and handed to the extraction chain, which
//! sends it to the model as the structured-output format and then checks the
//! reply against it with [`RecipeSchema::parse`].
//!
//! The structural check supports exactly the keywords the schema uses
//! (`type`, `required`, `properties`, `items`). Unknown extra properties in a
//! reply are accepted, as draft-07 does by default, and dropped when the value
//! is converted into [`RecipeExtraction`].

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::fmt;

/// Parsed result of one extraction call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeExtraction {
    pub recipes: Vec<Recipe>,
}

/// A single recipe found in a chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub ingredients: Vec<Ingredient>,
}

/// One ingredient line. `unit` is empty for countable items ("2 eggs").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    #[serde(serialize_with = "serialize_amount")]
    pub amount: f64,
    pub unit: String,
}

/// Write whole amounts as integers so `2` stays `2` instead of `2.0`.
fn serialize_amount<S: Serializer>(amount: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if amount.fract() == 0.0 && amount.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*amount as i64)
    } else {
        serializer.serialize_f64(*amount)
    }
}

impl RecipeExtraction {
    /// Total number of ingredient lines across all recipes.
    pub fn ingredient_count(&self) -> usize {
        self.recipes.iter().map(|r| r.ingredients.len()).sum()
    }
}

/// A reply that does not satisfy the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSON pointer of the offending value (`""` for the root).
    pub pointer: String,
    pub detail: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", display_pointer(&self.pointer), self.detail)
    }
}

fn display_pointer(pointer: &str) -> &str {
    if pointer.is_empty() {
        "/"
    } else {
        pointer
    }
}

/// The immutable recipe schema.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeSchema {
    document: Value,
}

impl Default for RecipeSchema {
    fn default() -> Self {
        Self::recipe_information_extractor()
    }
}

impl RecipeSchema {
    /// The "Recipe Information Extractor" schema.
    pub fn recipe_information_extractor() -> Self {
        let document = json!({
            "type": "object",
            "title": "Recipe Information Extractor",
            "$schema": "http://json-schema.org/draft-07/schema#",
            "required": ["recipes"],
            "properties": {
                "recipes": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["name", "ingredients"],
                        "properties": {
                            "name": {
                                "type": "string",
                                "description": "The name of the recipe."
                            },
                            "ingredients": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "required": ["name", "amount", "unit"],
                                    "properties": {
                                        "name": {
                                            "type": "string",
                                            "description": "The name of the ingredient."
                                        },
                                        "unit": {
                                            "type": "string",
                                            "description": "The unit of the amount of the ingredient."
                                        },
                                        "amount": {
                                            "type": "number",
                                            "description": "The numeric amount of the ingredient."
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "description": "Schema for extracting recipe information from text."
        });
        Self { document }
    }

    /// The raw JSON Schema document.
    pub fn as_value(&self) -> &Value {
        &self.document
    }

    pub fn title(&self) -> &str {
        self.document
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// Check `value` against the schema.
    pub fn validate(&self, value: &Value) -> Result<(), SchemaViolation> {
        check(&self.document, value, "")
    }

    /// Validate `value` and convert it into the typed extraction result.
    pub fn parse(&self, value: Value) -> Result<RecipeExtraction, SchemaViolation> {
        self.validate(&value)?;
        serde_json::from_value(value).map_err(|e| SchemaViolation {
            pointer: String::new(),
            detail: e.to_string(),
        })
    }
}

fn check(schema: &Value, value: &Value, pointer: &str) -> Result<(), SchemaViolation> {
    if let Some(expected) = schema.get("type").and_then(Value::as_str) {
        if !type_matches(expected, value) {
            return Err(SchemaViolation {
                pointer: pointer.to_string(),
                detail: format!("expected {expected}, found {}", type_name(value)),
            });
        }
    }

    if let Value::Object(object) = value {
        check_object(schema, object, pointer)?;
    }

    if let (Value::Array(items), Some(item_schema)) = (value, schema.get("items")) {
        for (i, item) in items.iter().enumerate() {
            check(item_schema, item, &format!("{pointer}/{i}"))?;
        }
    }

    Ok(())
}

fn check_object(
    schema: &Value,
    object: &Map<String, Value>,
    pointer: &str,
) -> Result<(), SchemaViolation> {
    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if !object.contains_key(key) {
                return Err(SchemaViolation {
                    pointer: format!("{pointer}/{key}"),
                    detail: "missing required property".to_string(),
                });
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (key, property_schema) in properties {
            if let Some(child) = object.get(key) {
                check(property_schema, child, &format!("{pointer}/{key}"))?;
            }
        }
    }

    Ok(())
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
