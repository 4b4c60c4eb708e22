use serde_json::{Map, Value, json};

use crate::spec::form::FormSpec;
use crate::spec::question::{QuestionSpec, Rules};
use crate::visibility::VisibilityMap;

/// JSON Schema for a response map covering the visible questions of a form.
pub fn generate(spec: &FormSpec, visibility: &VisibilityMap) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for question in spec.questions() {
        if !visibility.get(&question.id).copied().unwrap_or(true) {
            continue;
        }
        let Some(schema) = question_schema(question) else {
            continue;
        };
        if question.required {
            required.push(Value::String(question.id.clone()));
        }
        properties.insert(question.id.clone(), schema);
    }

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn question_schema(question: &QuestionSpec) -> Option<Value> {
    let mut schema = match question.rules() {
        Rules::Choice {
            options,
            multiple: false,
        } => json!({ "type": "string", "enum": options }),
        Rules::Choice {
            options,
            multiple: true,
        } => json!({
            "type": "array",
            "items": { "type": "string", "enum": options },
            "uniqueItems": true,
        }),
        Rules::Text { max_length, .. } => {
            let mut schema = json!({ "type": "string" });
            if let Some(max_length) = max_length {
                schema["maxLength"] = json!(max_length);
            }
            schema
        }
        // Numeric answers travel as text; bounds are published as hints.
        Rules::Numeric { min, max } => {
            let mut schema = json!({ "type": "string", "format": "number" });
            if let Some(min) = min {
                schema["x-minimum"] = json!(min);
            }
            if let Some(max) = max {
                schema["x-maximum"] = json!(max);
            }
            schema
        }
        Rules::File {
            max_size_mb,
            allowed_extensions,
        } => {
            let mut schema = json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "size": { "type": "integer", "minimum": 0 },
                    "mimeType": { "type": "string" },
                },
                "required": ["name", "size"],
            });
            if let Some(max_size) = max_size_mb {
                schema["properties"]["size"]["maximum"] = json!(max_size * 1024.0 * 1024.0);
            }
            if let Some(allowed) = allowed_extensions {
                schema["x-allowedExtensions"] = json!(allowed);
            }
            schema
        }
        Rules::Unsupported => return None,
    };
    schema["title"] = Value::String(question.text.clone());
    Some(schema)
}
