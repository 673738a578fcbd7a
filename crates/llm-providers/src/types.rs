//! Common types for provider operations

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One piece of turn content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
        args: Value,
    },
    FunctionResult {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
        response: Value,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// A single turn of a conversation, in chronological order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self { role, parts }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::text(text)])
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![Part::text(text)])
    }

    /// Concatenation of all text parts
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::as_text).collect()
    }

    /// Function-call parts as `(name, args)` pairs
    pub fn function_calls(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.parts.iter().filter_map(|p| match p {
            Part::FunctionCall { name, args, .. } => Some((name.as_str(), args)),
            _ => None,
        })
    }
}

/// A function the model may call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema of the arguments object
    #[serde(default)]
    pub parameters: Value,
}

/// Immutable description of one generation call
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub conversation: Vec<Turn>,
    /// Overrides the adapter's configured default model
    pub model: Option<String>,
    pub system_instruction: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    /// Caller intent; the adapter method invoked decides the wire flag
    pub stream: bool,
    pub available_tools: Option<Vec<ToolDeclaration>>,
    pub cancellation_token: Option<CancellationToken>,
}

impl GenerationRequest {
    pub fn new(conversation: Vec<Turn>) -> Self {
        Self {
            conversation,
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDeclaration>) -> Self {
        self.available_tools = Some(tools);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Requested model, or the adapter's default
    pub(crate) fn model_or(&self, default: &str) -> String {
        self.model.clone().unwrap_or_else(|| default.to_string())
    }

    /// Tools, treating an empty list like no tools
    pub(crate) fn tools(&self) -> Option<&[ToolDeclaration]> {
        self.available_tools.as_deref().filter(|t| !t.is_empty())
    }
}

/// Why generation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopReason {
    Stop,
    MaxTokens,
    Other,
}

impl StopReason {
    /// Map an OpenAI-style `finish_reason` string
    pub fn from_finish_reason(reason: &str) -> Self {
        match reason {
            "stop" | "tool_calls" | "function_call" | "eos_token" | "stop_sequence" => {
                StopReason::Stop
            }
            "length" => StopReason::MaxTokens,
            _ => StopReason::Other,
        }
    }
}

/// Result of a non-streaming call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResponse {
    pub output_turn: Turn,
    pub stop_reason: StopReason,
    pub index: u32,
    pub model: String,
}

/// One incremental piece of a streamed response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamChunk {
    /// Assistant turn holding only this chunk's delta
    pub output_turn: Turn,
    /// Set on the terminal chunk
    pub stop_reason: Option<StopReason>,
    pub index: u32,
}

impl StreamChunk {
    pub fn text(&self) -> String {
        self.output_turn.text()
    }

    pub fn is_final(&self) -> bool {
        self.stop_reason.is_some()
    }
}

/// A model exposed by a provider, derived from a live query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub display_name: String,
    pub context_window: Option<u32>,
    pub supports_streaming: bool,
    pub supports_vision: bool,
}

/// Outcome of one detection pass for one provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderDescriptor {
    pub name: String,
    pub endpoint: Option<String>,
    pub available: bool,
    pub models: Vec<ModelDescriptor>,
}
