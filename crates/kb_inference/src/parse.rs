//! Tolerant decoding of model replies.

use kb_core::{DeepDive, Enrichment, Error, Gap, Result, GAP_FALLBACK, TOPICS_FALLBACK};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// Drops a surrounding ```json fence if the model added one.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_json(text: &str) -> Result<Value> {
    serde_json::from_str(strip_code_fence(text))
        .map_err(|e| Error::Inference(format!("Model returned invalid JSON: {}", e)))
}

/// Reads `{"<id>": {"topics": ..., "gap": ...}}`. Missing fields fall back to the sentinels.
pub fn enrichment_map(text: &str) -> Result<HashMap<String, Enrichment>> {
    let Value::Object(entries) = parse_json(text)? else {
        return Err(Error::Inference("Expected a JSON object keyed by article id".to_string()));
    };

    let mut map = HashMap::with_capacity(entries.len());
    for (key, entry) in entries {
        let Value::Object(fields) = entry else {
            warn!("Ignoring malformed enrichment for {}", key);
            continue;
        };
        let topics = fields
            .get("topics")
            .and_then(text_or_list)
            .unwrap_or_else(|| TOPICS_FALLBACK.to_string());
        let gap = fields
            .get("gap")
            .and_then(text_or_list)
            .unwrap_or_else(|| GAP_FALLBACK.to_string());
        map.insert(key, Enrichment { topics, gap });
    }
    Ok(map)
}

fn text_or_list(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::trim))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

pub fn global_gaps(text: &str) -> Result<Vec<Gap>> {
    list_under(parse_json(text)?, "global_gaps")
}

pub fn deep_dive(text: &str) -> Result<Vec<DeepDive>> {
    let mut value = parse_json(text)?;
    // Outlines sometimes come back as nested sections instead of one string.
    if let Some(items) = list_mut(&mut value, "deep_dive") {
        for item in items.iter_mut().filter_map(Value::as_object_mut) {
            for key in ["Article Outline", "article_outline"] {
                if let Some(outline) = item.get_mut(key) {
                    if !outline.is_string() {
                        *outline = Value::String(render_outline(outline));
                    }
                }
            }
        }
    }
    list_under(value, "deep_dive")
}

fn list_mut<'a>(value: &'a mut Value, key: &str) -> Option<&'a mut Vec<Value>> {
    if value.is_array() {
        return value.as_array_mut();
    }
    value.get_mut(key).and_then(Value::as_array_mut)
}

/// Accepts either `{"<key>": [...]}` or a bare list.
fn list_under<T: DeserializeOwned>(value: Value, key: &str) -> Result<Vec<T>> {
    let list = match value {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut map) => map
            .remove(key)
            .ok_or_else(|| Error::Inference(format!("Model reply has no '{}' list", key)))?,
        other => {
            return Err(Error::Inference(format!(
                "Expected a '{}' list, got {}",
                key, other
            )))
        }
    };
    serde_json::from_value(list)
        .map_err(|e| Error::Inference(format!("Malformed '{}' entries: {}", key, e)))
}

fn render_outline(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(render_outline).collect::<Vec<_>>().join("\n"),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}: {}", k, render_outline(v)))
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}
