//! JSON-Schema documents as plain data, with pure add/remove transforms and
//! validation through the `jsonschema` crate.

use crate::error::{DeckError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonSchema(Value);

impl JsonSchema {
    pub fn new(schema: Value) -> Self {
        Self(schema)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Removes every property named in `names`, at any depth, together with
    /// its `required` entry.
    pub fn without_fields(&self, names: &[&str]) -> JsonSchema {
        let mut schema = self.0.clone();
        strip_fields(&mut schema, names);
        JsonSchema(schema)
    }

    /// Adds a top-level property, optionally marking it required.
    pub fn with_field(&self, name: &str, descriptor: Value, required: bool) -> JsonSchema {
        let mut schema = self.0.clone();
        if !schema.is_object() {
            schema = json!({ "type": "object" });
        }
        if let Some(root) = schema.as_object_mut() {
            let properties = root
                .entry("properties")
                .or_insert_with(|| Value::Object(Map::new()));
            if let Some(properties) = properties.as_object_mut() {
                properties.insert(name.to_string(), descriptor);
            }

            if required {
                let list = root
                    .entry("required")
                    .or_insert_with(|| Value::Array(Vec::new()));
                if let Some(list) = list.as_array_mut() {
                    if !list.iter().any(|v| v.as_str() == Some(name)) {
                        list.push(Value::String(name.to_string()));
                    }
                }
            }
        }
        JsonSchema(schema)
    }

    /// Checks `value` and reports the first violation. A schema that does
    /// not compile is the caller's fault and surfaces as `InvalidRequest`.
    pub fn validate(&self, value: &Value) -> Result<()> {
        let validator = jsonschema::validator_for(&self.0)
            .map_err(|e| DeckError::InvalidRequest(format!("invalid JSON schema: {}", e)))?;

        let result = match validator.iter_errors(value).next() {
            None => Ok(()),
            Some(error) => {
                let pointer = error.instance_path.to_string();
                let keyword = error.schema_path.to_string();
                let keyword = keyword.rsplit('/').next().unwrap_or_default();
                Err(DeckError::schema(
                    display_path(value, &pointer),
                    format!("{} violated: {}", keyword, error),
                ))
            }
        };
        result
    }
}

impl From<Value> for JsonSchema {
    fn from(value: Value) -> Self {
        JsonSchema(value)
    }
}

fn strip_fields(node: &mut Value, names: &[&str]) {
    match node {
        Value::Object(map) => {
            if let Some(Value::Object(properties)) = map.get_mut("properties") {
                for name in names {
                    properties.remove(*name);
                }
            }
            if let Some(Value::Array(required)) = map.get_mut("required") {
                required.retain(|v| !v.as_str().map_or(false, |s| names.contains(&s)));
            }
            for child in map.values_mut() {
                strip_fields(child, names);
            }
        }
        Value::Array(items) => {
            for child in items {
                strip_fields(child, names);
            }
        }
        _ => {}
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Renders a JSON pointer into the instance as `slides[2].content`,
/// using the instance itself to tell array indices from object keys.
fn display_path(instance: &Value, pointer: &str) -> String {
    let mut rendered = String::new();
    let mut current = Some(instance);

    for segment in pointer.split('/').skip(1) {
        let key = segment.replace("~1", "/").replace("~0", "~");
        match current {
            Some(Value::Array(items)) => {
                let index = key.parse::<usize>().ok();
                rendered.push_str(&format!("[{}]", key));
                current = index.and_then(|i| items.get(i));
            }
            other => {
                if !rendered.is_empty() {
                    rendered.push('.');
                }
                current = other.and_then(|v| v.get(&key));
                rendered.push_str(&key);
            }
        }
    }

    if rendered.is_empty() {
        "$".to_string()
    } else {
        rendered
    }
}

fn slide_outline_item(closed: bool) -> Value {
    let mut item = json!({
        "type": "object",
        "properties": {
            "content": {
                "type": "string",
                "description": "Markdown content for the slide"
            }
        },
        "required": ["content"]
    });
    if closed {
        item["additionalProperties"] = Value::Bool(false);
    }
    item
}

/// Shape requested from the model: exactly `n_slides` entries.
pub fn outline_response_schema(n_slides: u32) -> JsonSchema {
    JsonSchema(json!({
        "title": "PresentationOutline",
        "type": "object",
        "properties": {
            "slides": {
                "type": "array",
                "description": "List of slides",
                "minItems": n_slides,
                "maxItems": n_slides,
                "items": slide_outline_item(true)
            }
        },
        "required": ["slides"],
        "additionalProperties": false
    }))
}

/// Shape accepted after parsing. Excess slides are truncated later, so no
/// upper bound; an empty list is rejected. Extra keys on a slide are
/// tolerated and dropped on deserialization.
pub fn outline_validation_schema() -> JsonSchema {
    JsonSchema(json!({
        "type": "object",
        "properties": {
            "slides": {
                "type": "array",
                "minItems": 1,
                "items": slide_outline_item(false)
            }
        },
        "required": ["slides"]
    }))
}
