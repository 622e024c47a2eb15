//! JSON-schema `$ref` flattening for remote tool definitions.
//!
//! Tool servers often publish input schemas with local `$defs` references.
//! The Messages API wants self-contained schemas, so every local reference is
//! inlined and the definition tables are dropped.

use serde_json::{Map, Value};

const DEF_PREFIXES: [&str; 2] = ["#/$defs/", "#/definitions/"];
const DEF_TABLES: [&str; 2] = ["$defs", "definitions"];

/// Returns `schema` with local `#/$defs/*` and `#/definitions/*` references
/// inlined.
///
/// Keys next to a `$ref` override the same keys of the target. A reference
/// that leads back into itself becomes `{}`. Unknown references are left as
/// they are.
pub fn flatten_refs(schema: &Value) -> Value {
    let mut defs = Map::new();
    if let Value::Object(root) = schema {
        for table in DEF_TABLES {
            if let Some(Value::Object(entries)) = root.get(table) {
                for (name, def) in entries {
                    defs.insert(format!("#/{table}/{name}"), def.clone());
                }
            }
        }
    }

    let mut stack = Vec::new();
    match resolve(schema, &defs, &mut stack) {
        Value::Object(mut root) => {
            for table in DEF_TABLES {
                root.remove(table);
            }
            Value::Object(root)
        }
        other => other,
    }
}

fn resolve(value: &Value, defs: &Map<String, Value>, stack: &mut Vec<String>) -> Value {
    match value {
        Value::Object(map) => {
            if let Some(reference) = map.get("$ref").and_then(Value::as_str)
                && DEF_PREFIXES.iter().any(|p| reference.starts_with(p))
            {
                let key = unescape_pointer(reference);
                if stack.contains(&key) {
                    tracing::debug!(reference, "cyclic schema reference dropped");
                    return Value::Object(Map::new());
                }
                if let Some(target) = defs.get(&key) {
                    stack.push(key);
                    let resolved = resolve(target, defs, stack);
                    stack.pop();
                    return merge_siblings(resolved, map, defs, stack);
                }
            }
            Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), resolve(v, defs, stack)))
                    .collect(),
            )
        }
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| resolve(item, defs, stack)).collect())
        }
        other => other.clone(),
    }
}

fn merge_siblings(
    resolved: Value,
    with_ref: &Map<String, Value>,
    defs: &Map<String, Value>,
    stack: &mut Vec<String>,
) -> Value {
    let siblings: Vec<_> = with_ref.iter().filter(|(k, _)| *k != "$ref").collect();
    if siblings.is_empty() {
        return resolved;
    }
    let mut merged = match resolved {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for (k, v) in siblings {
        merged.insert(k.clone(), resolve(v, defs, stack));
    }
    Value::Object(merged)
}

/// Decodes `~1` and `~0` in the last pointer segment.
fn unescape_pointer(reference: &str) -> String {
    match reference.rsplit_once('/') {
        Some((prefix, name)) => format!("{prefix}/{}", name.replace("~1", "/").replace("~0", "~")),
        None => reference.to_string(),
    }
}
