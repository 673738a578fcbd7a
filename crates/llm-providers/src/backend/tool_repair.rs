//! Recovery of tool calls that Ollama returns as plain text
//!
//! Some Ollama models answer a tool-enabled request with the call serialized
//! as JSON in the message text instead of the `tool_calls` field. The trigger
//! is narrow: the whole text (optionally inside one fenced code block) must be
//! a JSON object whose only keys are `name` and `arguments`.

use serde_json::Value;
use uuid::Uuid;

use super::chat_wire::parse_arguments;
use super::ProviderError;
use crate::types::Part;

/// Strip a single surrounding ``` or ```json fence
fn unfence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening line.
    match inner.find('\n') {
        Some(newline) => inner[newline + 1..].trim(),
        None => inner.trim(),
    }
}

/// Generate a call id in the `call_<hex>` shape OpenAI servers use
pub(crate) fn new_call_id() -> String {
    format!("call_{}", Uuid::new_v4().simple())
}

/// Try to read `text` as an embedded tool call.
///
/// `Ok(None)` means the text is an ordinary completion. A match whose
/// string-encoded arguments are not valid JSON is a decode error.
pub(crate) fn repair_text_tool_call(text: &str) -> Result<Option<Part>, ProviderError> {
    let candidate = unfence(text);
    if !candidate.starts_with('{') {
        return Ok(None);
    }

    let Ok(Value::Object(mut object)) = serde_json::from_str::<Value>(candidate) else {
        return Ok(None);
    };
    if object.len() != 2 || !object.contains_key("arguments") {
        return Ok(None);
    }
    let name = match object.get("name") {
        Some(Value::String(name)) if !name.is_empty() => name.clone(),
        _ => return Ok(None),
    };

    let arguments = object.remove("arguments").unwrap_or(Value::Null);
    let args = parse_arguments(&name, arguments)?;

    log::debug!("Recovered text-embedded tool call '{}'", name);
    Ok(Some(Part::FunctionCall {
        id: Some(new_call_id()),
        name,
        args,
    }))
}
