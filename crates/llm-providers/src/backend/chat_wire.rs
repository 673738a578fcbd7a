//! OpenAI chat-completions wire schema
//!
//! Ollama and LM Studio both speak `/v1/chat/completions`. They differ only in
//! how function parts are sent and whether tools are declared, so both build,
//! post and decode through this module.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{send_cancellable, ProviderError};
use crate::types::{
    GenerationRequest, GenerationResponse, Part, Role, StopReason, ToolDeclaration, Turn,
};

/// How function-call and function-result parts are put on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FunctionPartStyle {
    /// `tool_calls` on assistant messages, `role: "tool"` for results
    Structured,
    /// Rendered into the message text
    Textual,
}

// ─── REQUEST ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<WireTool>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct WireMessage {
    pub role: &'static str,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl WireMessage {
    fn plain(role: &'static str, content: String) -> Self {
        Self {
            role,
            content,
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct WireToolCall {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: WireFunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct WireFunctionCall {
    pub name: String,
    /// JSON-encoded arguments object
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct WireTool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: WireFunctionDecl,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct WireFunctionDecl {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: Value,
}

/// Backend vocabulary for a conversation role
pub(crate) fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Convert declarations to the function-tool schema
pub(crate) fn wire_tools(tools: &[ToolDeclaration]) -> Vec<WireTool> {
    tools
        .iter()
        .map(|tool| WireTool {
            kind: "function",
            function: WireFunctionDecl {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: if tool.parameters.is_null() {
                    serde_json::json!({ "type": "object", "properties": {} })
                } else {
                    tool.parameters.clone()
                },
            },
        })
        .collect()
}

/// Request body for one chat call
pub(crate) fn completion_request(
    request: &GenerationRequest,
    model: String,
    style: FunctionPartStyle,
    tools: Option<Vec<WireTool>>,
    stream: bool,
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model,
        messages: build_messages(request, style),
        temperature: request.temperature,
        max_tokens: request.max_output_tokens,
        stream,
        tools,
    }
}

/// POST `{base_url}/v1/chat/completions`; non-success becomes `Rejected`
pub(crate) async fn post_chat(
    http_client: &reqwest::Client,
    provider: &str,
    base_url: &str,
    body: &ChatCompletionRequest,
    request: &GenerationRequest,
) -> Result<reqwest::Response, ProviderError> {
    let url = format!("{}/v1/chat/completions", base_url);
    let response = send_cancellable(http_client.post(&url).json(body), request).await?;
    if !response.status().is_success() {
        return Err(ProviderError::rejected(provider, response).await);
    }
    Ok(response)
}

/// Render a function call as a single line of text
pub(crate) fn function_call_text(name: &str, args: &Value) -> String {
    format!("[function call] {} {}", name, args)
}

/// Render a function result as a single line of text
pub(crate) fn function_result_text(name: &str, response: &Value) -> String {
    format!("[function result] {} {}", name, response)
}

/// Build the backend-native message list, preserving turn order
pub(crate) fn build_messages(
    request: &GenerationRequest,
    style: FunctionPartStyle,
) -> Vec<WireMessage> {
    let mut messages = Vec::with_capacity(request.conversation.len() + 1);

    if let Some(system) = request
        .system_instruction
        .as_deref()
        .filter(|s| !s.is_empty())
    {
        messages.push(WireMessage::plain("system", system.to_string()));
    }

    for turn in &request.conversation {
        match style {
            FunctionPartStyle::Structured => push_structured(&mut messages, turn),
            FunctionPartStyle::Textual => messages.push(textual_message(turn)),
        }
    }

    messages
}

fn textual_message(turn: &Turn) -> WireMessage {
    let lines: Vec<String> = turn
        .parts
        .iter()
        .map(|part| match part {
            Part::Text { text } => text.clone(),
            Part::FunctionCall { name, args, .. } => function_call_text(name, args),
            Part::FunctionResult { name, response, .. } => function_result_text(name, response),
        })
        .collect();
    WireMessage::plain(wire_role(turn.role), lines.join("\n"))
}

fn push_structured(messages: &mut Vec<WireMessage>, turn: &Turn) {
    let mut text = String::new();
    let mut tool_calls = Vec::new();
    let mut results = Vec::new();

    for part in &turn.parts {
        match part {
            Part::Text { text: t } => text.push_str(t),
            Part::FunctionCall { id, name, args } => tool_calls.push(WireToolCall {
                id: id.clone(),
                kind: "function",
                function: WireFunctionCall {
                    name: name.clone(),
                    arguments: args.to_string(),
                },
            }),
            Part::FunctionResult { id, name, response } => results.push(WireMessage {
                role: "tool",
                content: match response {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                },
                tool_calls: None,
                tool_call_id: id.clone(),
                name: Some(name.clone()),
            }),
        }
    }

    let has_results = !results.is_empty();
    messages.extend(results);

    if !text.is_empty() || !tool_calls.is_empty() || !has_results {
        messages.push(WireMessage {
            role: wire_role(turn.role),
            content: text,
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            tool_call_id: None,
            name: None,
        });
    }
}

// ─── RESPONSE ───────────────────────────────────────────────────────

/// Envelope that may arrive as a single object or an array of objects
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_first(self) -> Option<T> {
        match self {
            OneOrMany::Many(items) => items.into_iter().next(),
            OneOrMany::One(item) => Some(item),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletion {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub message: Option<ChatResponseMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChatResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseToolCall {
    #[serde(default)]
    pub id: Option<String>,
    pub function: ResponseFunction,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseFunction {
    pub name: String,
    /// Usually a JSON-encoded string; some servers send an object
    #[serde(default)]
    pub arguments: Value,
}

/// Decoded pieces of a non-streaming completion
#[derive(Debug)]
pub(crate) struct DecodedCompletion {
    pub parts: Vec<Part>,
    pub stop_reason: StopReason,
    pub index: u32,
    pub model: Option<String>,
    /// The backend returned structured `tool_calls`
    pub structured_tool_calls: bool,
}

impl DecodedCompletion {
    /// Assistant response, naming `requested_model` when the server omits one
    pub(crate) fn into_response(self, requested_model: String) -> GenerationResponse {
        GenerationResponse {
            output_turn: Turn::new(Role::Assistant, self.parts),
            stop_reason: self.stop_reason,
            index: self.index,
            model: self.model.unwrap_or(requested_model),
        }
    }
}

/// Parse function arguments that may be string-encoded
pub(crate) fn parse_arguments(name: &str, arguments: Value) -> Result<Value, ProviderError> {
    match arguments {
        Value::String(s) if s.trim().is_empty() => Ok(Value::Object(Default::default())),
        Value::String(s) => serde_json::from_str(&s).map_err(|e| {
            ProviderError::Decode(format!("Invalid arguments for function '{}': {}", name, e))
        }),
        Value::Null => Ok(Value::Object(Default::default())),
        other => Ok(other),
    }
}

/// Decode the first choice of a completion envelope
pub(crate) fn decode_completion(
    envelope: OneOrMany<ChatCompletion>,
) -> Result<DecodedCompletion, ProviderError> {
    let completion = envelope
        .into_first()
        .ok_or_else(|| ProviderError::Decode("Empty completion envelope".to_string()))?;
    let model = completion.model;
    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Decode("Completion has no choices".to_string()))?;

    let message = choice.message.unwrap_or_default();
    let mut parts = vec![Part::text(message.content.unwrap_or_default())];

    let tool_calls = message.tool_calls.unwrap_or_default();
    let structured_tool_calls = !tool_calls.is_empty();
    for call in tool_calls {
        let args = parse_arguments(&call.function.name, call.function.arguments)?;
        parts.push(Part::FunctionCall {
            id: call.id,
            name: call.function.name,
            args,
        });
    }

    // A tool-call-only reply carries an empty text part; drop it.
    if structured_tool_calls && parts[0].as_text() == Some("") {
        parts.remove(0);
    }

    Ok(DecodedCompletion {
        parts,
        stop_reason: choice
            .finish_reason
            .as_deref()
            .map(StopReason::from_finish_reason)
            .unwrap_or(StopReason::Stop),
        index: choice.index,
        model,
        structured_tool_calls,
    })
}

// ─── STREAM CHUNKS ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Set when the server fails after the stream has started
    #[serde(default)]
    pub error: Option<Value>,
}

/// Human-readable text of an `error` payload (string or `{message}` object)
pub(crate) fn error_message(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        Value::Object(fields) => match fields.get("message") {
            Some(Value::String(message)) => message.clone(),
            _ => error.to_string(),
        },
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChunkChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToolCallDelta {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionDelta>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    /// String fragment, or a whole object from servers that do not split
    #[serde(default)]
    pub arguments: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn abc_request() -> GenerationRequest {
        GenerationRequest::new(vec![Turn::user("A"), Turn::assistant("B"), Turn::user("C")])
    }

    #[test]
    fn test_role_mapping_preserves_order_and_text() {
        for style in [FunctionPartStyle::Structured, FunctionPartStyle::Textual] {
            let messages = build_messages(&abc_request(), style);
            let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
            let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
            assert_eq!(roles, vec!["user", "assistant", "user"]);
            assert_eq!(contents, vec!["A", "B", "C"]);
        }
    }

    #[test]
    fn test_system_instruction_leads() {
        let request = abc_request().with_system_instruction("Be brief.");
        let messages = build_messages(&request, FunctionPartStyle::Textual);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, "Be brief.");
        assert_eq!(messages.len(), 4);
    }

    #[test]
    fn test_structured_function_parts() {
        let request = GenerationRequest::new(vec![
            Turn::user("weather?"),
            Turn::new(
                Role::Assistant,
                vec![Part::FunctionCall {
                    id: Some("call_1".to_string()),
                    name: "get_weather".to_string(),
                    args: json!({ "city": "Oslo" }),
                }],
            ),
            Turn::new(
                Role::User,
                vec![Part::FunctionResult {
                    id: Some("call_1".to_string()),
                    name: "get_weather".to_string(),
                    response: json!({ "temp": 3 }),
                }],
            ),
        ]);

        let messages = build_messages(&request, FunctionPartStyle::Structured);
        assert_eq!(messages.len(), 3);

        let call = &messages[1].tool_calls.as_ref().unwrap()[0];
        assert_eq!(messages[1].role, "assistant");
        assert_eq!(call.function.name, "get_weather");
        assert_eq!(
            serde_json::from_str::<Value>(&call.function.arguments).unwrap(),
            json!({ "city": "Oslo" })
        );

        assert_eq!(messages[2].role, "tool");
        assert_eq!(messages[2].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(messages[2].content, r#"{"temp":3}"#);
    }

    #[test]
    fn test_textual_function_parts() {
        let request = GenerationRequest::new(vec![Turn::new(
            Role::Assistant,
            vec![
                Part::text("Checking."),
                Part::FunctionCall {
                    id: None,
                    name: "ls".to_string(),
                    args: json!({ "path": "/" }),
                },
            ],
        )]);
        let messages = build_messages(&request, FunctionPartStyle::Textual);
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].content,
            "Checking.\n[function call] ls {\"path\":\"/\"}"
        );
        assert!(messages[0].tool_calls.is_none());
    }

    #[test]
    fn test_wire_tools_schema() {
        let tools = wire_tools(&[ToolDeclaration {
            name: "read_file".to_string(),
            description: Some("Read a file".to_string()),
            parameters: json!({ "type": "object", "properties": { "path": { "type": "string" } } }),
        }]);
        let value = serde_json::to_value(&tools).unwrap();
        assert_eq!(value[0]["type"], "function");
        assert_eq!(value[0]["function"]["name"], "read_file");
        assert_eq!(value[0]["function"]["parameters"]["properties"]["path"]["type"], "string");
    }

    #[test]
    fn test_decode_single_and_array_envelopes() {
        let body = json!({
            "model": "llama3.2",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": "hi" }, "finish_reason": "stop" }]
        });
        let single: OneOrMany<ChatCompletion> = serde_json::from_value(body.clone()).unwrap();
        let array: OneOrMany<ChatCompletion> = serde_json::from_value(json!([body])).unwrap();

        for envelope in [single, array] {
            let decoded = decode_completion(envelope).unwrap();
            assert_eq!(decoded.parts, vec![Part::text("hi")]);
            assert_eq!(decoded.stop_reason, StopReason::Stop);
            assert_eq!(decoded.model.as_deref(), Some("llama3.2"));
        }
    }

    #[test]
    fn test_decode_null_content_is_empty_text() {
        let envelope: OneOrMany<ChatCompletion> = serde_json::from_value(json!({
            "choices": [{ "message": { "content": null }, "finish_reason": "stop" }]
        }))
        .unwrap();
        let decoded = decode_completion(envelope).unwrap();
        assert_eq!(decoded.parts, vec![Part::text("")]);
    }

    #[test]
    fn test_decode_structured_tool_calls() {
        let envelope: OneOrMany<ChatCompletion> = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "content": "",
                    "tool_calls": [{ "id": "call_9", "type": "function",
                        "function": { "name": "foo", "arguments": "{\"x\":1}" } }]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();
        let decoded = decode_completion(envelope).unwrap();
        assert!(decoded.structured_tool_calls);
        assert_eq!(
            decoded.parts,
            vec![Part::FunctionCall {
                id: Some("call_9".to_string()),
                name: "foo".to_string(),
                args: json!({ "x": 1 }),
            }]
        );
    }

    #[test]
    fn test_decode_invalid_tool_arguments_is_error() {
        let envelope: OneOrMany<ChatCompletion> = serde_json::from_value(json!({
            "choices": [{ "message": { "tool_calls": [
                { "function": { "name": "foo", "arguments": "{not json" } }
            ] } }]
        }))
        .unwrap();
        assert!(matches!(
            decode_completion(envelope),
            Err(ProviderError::Decode(_))
        ));
    }

    #[test]
    fn test_response_falls_back_to_requested_model() {
        let envelope: OneOrMany<ChatCompletion> = serde_json::from_value(json!({
            "choices": [{ "message": { "content": "hi" }, "finish_reason": "stop" }]
        }))
        .unwrap();
        let response = decode_completion(envelope)
            .unwrap()
            .into_response("llama3.2".to_string());
        assert_eq!(response.model, "llama3.2");
        assert_eq!(response.output_turn.role, Role::Assistant);
        assert_eq!(response.output_turn.text(), "hi");
    }

    #[test]
    fn test_error_message_forms() {
        assert_eq!(error_message(&json!("overloaded")), "overloaded");
        assert_eq!(error_message(&json!({ "message": "model crashed" })), "model crashed");
        assert_eq!(error_message(&json!({ "code": 500 })), r#"{"code":500}"#);
    }
}
