use crate::errors::ToolError;
use crate::utils::suggest::suggest;
use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

static TOOL_CATALOG: Lazy<Vec<ToolDef>> = Lazy::new(|| {
    let raw = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tool_catalog.json"));
    serde_json::from_str(raw).expect("tool_catalog.json must be valid JSON")
});

static TOOL_MAP: Lazy<HashMap<String, ToolDef>> = Lazy::new(|| {
    TOOL_CATALOG
        .iter()
        .cloned()
        .map(|tool| (tool.name.clone(), tool))
        .collect()
});

static TOOL_VALIDATORS: Lazy<HashMap<String, JSONSchema>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for tool in TOOL_CATALOG.iter() {
        if let Ok(schema) = JSONSchema::compile(&tool.input_schema) {
            map.insert(tool.name.clone(), schema);
        }
    }
    map
});

pub fn tool_catalog() -> &'static Vec<ToolDef> {
    &TOOL_CATALOG
}

pub fn tool_by_name(name: &str) -> Option<&'static ToolDef> {
    TOOL_MAP.get(name)
}

/// Checks `args` against the tool's declared input schema. Tools without a
/// catalog entry are not validated here.
pub fn validate_tool_args(tool_name: &str, args: &Value) -> Result<(), ToolError> {
    let Some(tool) = tool_by_name(tool_name) else {
        return Ok(());
    };
    let Some(schema) = TOOL_VALIDATORS.get(tool_name) else {
        return Ok(());
    };
    if let Err(errors) = schema.validate(args) {
        let (message, problems) = format_schema_errors(tool_name, errors, &tool.input_schema);
        return Err(ToolError::invalid_params(message)
            .with_hint(format!("See the inputSchema of '{}' in tools/list.", tool_name))
            .with_details(serde_json::json!({ "problems": problems })));
    }
    Ok(())
}

fn format_schema_errors(
    tool_name: &str,
    errors: jsonschema::ErrorIterator,
    schema: &Value,
) -> (String, Vec<String>) {
    let known_fields: Vec<String> = schema
        .get("properties")
        .and_then(|v| v.as_object())
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default();

    let mut rendered = Vec::new();
    let mut did_you_means = Vec::new();
    for err in errors.take(10) {
        let instance_path = if err.instance_path.to_string().is_empty() {
            "(root)".to_string()
        } else {
            err.instance_path.to_string()
        };
        match &err.kind {
            jsonschema::error::ValidationErrorKind::AdditionalProperties { unexpected } => {
                for unknown in unexpected {
                    rendered.push(format!("{}: unknown field '{}'", instance_path, unknown));
                    let suggestions = suggest(unknown, known_fields.as_slice(), 3);
                    if !suggestions.is_empty() {
                        did_you_means.push(format!(
                            "field '{}': {}",
                            unknown,
                            suggestions.join(", ")
                        ));
                    }
                }
            }
            jsonschema::error::ValidationErrorKind::Required { property } => {
                let prop = property
                    .as_str()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| property.to_string());
                rendered.push(format!(
                    "{}: missing required field '{}'",
                    instance_path, prop
                ));
            }
            jsonschema::error::ValidationErrorKind::Type { kind } => {
                rendered.push(format!(
                    "{}: expected {}",
                    instance_path,
                    format_type_kind(kind)
                ));
            }
            _ => {
                rendered.push(format!("{}: {}", instance_path, err));
            }
        }
    }

    let mut lines = vec![format!("Invalid arguments for {}", tool_name)];
    lines.extend(rendered.iter().map(|line| format!("- {}", line)));
    if !did_you_means.is_empty() {
        lines.push(format!("Did you mean: {}", did_you_means.join(" | ")));
    }
    (lines.join("\n"), rendered)
}

fn format_type_kind(kind: &jsonschema::error::TypeKind) -> String {
    match kind {
        jsonschema::error::TypeKind::Single(primitive) => primitive.to_string(),
        jsonschema::error::TypeKind::Multiple(types) => {
            let list: Vec<String> = (*types).into_iter().map(|t| t.to_string()).collect();
            if list.is_empty() {
                "unknown".to_string()
            } else {
                list.join(" | ")
            }
        }
    }
}

/// Rewrites `"type": [..]` unions (used for nullable parameters) into
/// `anyOf`, which more tool-calling clients understand.
pub fn normalize_json_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => {
            let mut out = map.clone();
            if let Some(props) = map.get("properties").and_then(|v| v.as_object()) {
                let normalized = props
                    .iter()
                    .map(|(key, value)| (key.clone(), normalize_json_schema(value)))
                    .collect();
                out.insert("properties".to_string(), Value::Object(normalized));
            }
            if let Some(types) = map.get("type").and_then(|v| v.as_array()) {
                out.remove("type");
                let any_of = types
                    .iter()
                    .filter_map(|t| t.as_str())
                    .map(|t| serde_json::json!({ "type": t }))
                    .collect();
                out.insert("anyOf".to_string(), Value::Array(any_of));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(normalize_json_schema).collect()),
        _ => schema.clone(),
    }
}

/// The catalog as advertised by `tools/list`.
pub fn list_tools() -> Vec<ToolDef> {
    TOOL_CATALOG
        .iter()
        .map(|tool| ToolDef {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: normalize_json_schema(&tool.input_schema),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_parses_and_compiles() {
        assert_eq!(tool_catalog().len(), 10);
        for tool in tool_catalog() {
            assert!(
                TOOL_VALIDATORS.contains_key(&tool.name),
                "schema for {} must compile",
                tool.name
            );
        }
    }

    #[test]
    fn missing_required_field_is_reported() {
        let err = validate_tool_args("send_message", &serde_json::json!({"prompt": "hi"}))
            .unwrap_err();
        assert!(err.message.contains("missing required field 'session_name'"));
    }

    #[test]
    fn unknown_field_gets_a_suggestion() {
        let err = validate_tool_args(
            "get_session",
            &serde_json::json!({"session_name": "sessions/1", "sesion_nam": "x"}),
        )
        .unwrap_err();
        assert!(err.message.contains("unknown field 'sesion_nam'"));
        assert!(err.message.contains("Did you mean"));
    }

    #[test]
    fn nulls_are_accepted_for_optional_parameters() {
        validate_tool_args(
            "list_sessions",
            &serde_json::json!({"page_size": null, "page_token": null}),
        )
        .unwrap();
    }

    #[test]
    fn wrong_type_is_rejected() {
        let err = validate_tool_args("list_sessions", &serde_json::json!({"page_size": "ten"}))
            .unwrap_err();
        assert_eq!(err.kind, crate::errors::ToolErrorKind::InvalidParams);
    }

    #[test]
    fn normalize_turns_type_unions_into_any_of() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {"branch": {"type": ["string", "null"], "description": "b"}}
        });
        let normalized = normalize_json_schema(&schema);
        assert_eq!(normalized["type"], "object");
        assert_eq!(
            normalized["properties"]["branch"],
            serde_json::json!({"description": "b", "anyOf": [{"type": "string"}, {"type": "null"}]})
        );
    }
}
