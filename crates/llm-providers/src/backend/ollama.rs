//! Ollama backend implementation
//!
//! Talks to a running Ollama daemon. Chat goes through the OpenAI-compatible
//! `/v1/chat/completions` endpoint; discovery uses the native `/api/tags`.
//! Some models put tool calls in the message text instead of `tool_calls`;
//! non-streaming replies are repaired by [`super::tool_repair`].

use async_trait::async_trait;
use serde::Deserialize;

use super::chat_wire::{
    completion_request, decode_completion, post_chat, wire_tools, ChatCompletionRequest,
    FunctionPartStyle,
};
use super::tool_repair::repair_text_tool_call;
use super::{
    probe, read_json_cancellable, sse, ChunkStream, Provider, ProviderCapabilities,
    ProviderError,
};
use crate::config::ProviderSettings;
use crate::constants::{defaults, names, AVAILABILITY_TIMEOUT};
use crate::types::{GenerationRequest, GenerationResponse, ModelDescriptor, Part};

/// Model entry from `/api/tags`
#[derive(Debug, Clone, Deserialize)]
struct OllamaModel {
    name: String,
}

/// Ollama tags response (list of models)
#[derive(Debug, Clone, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

/// Ollama daemon adapter
pub struct OllamaProvider {
    /// HTTP client for API requests
    http_client: reqwest::Client,
    /// Base URL of the Ollama daemon, without trailing slash
    base_url: String,
    /// Model used when the request does not name one
    default_model: String,
    /// Reported for every model; Ollama's tag list has no context length
    context_window: Option<u32>,
}

impl OllamaProvider {
    /// Create an adapter with its own HTTP client
    pub fn new(settings: &ProviderSettings) -> Self {
        Self::with_client(super::registry::default_client(), settings)
    }

    /// Create an adapter sharing an existing HTTP client
    pub fn with_client(http_client: reqwest::Client, settings: &ProviderSettings) -> Self {
        Self {
            http_client,
            base_url: settings.endpoint_or(defaults::OLLAMA_ENDPOINT),
            default_model: settings.model_or(defaults::OLLAMA_MODEL),
            context_window: settings.context_window,
        }
    }

    /// Get static capabilities (for registry info before instantiation)
    pub fn static_capabilities() -> ProviderCapabilities {
        ProviderCapabilities {
            streaming: true,
            vision: true,       // llava and *-vision models
            tool_calling: true, // Via OpenAI-compatible API
        }
    }

    /// Name-based vision heuristic
    pub fn is_vision_model(name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        name.contains("vision") || name.contains("llava")
    }

    fn build_request(&self, request: &GenerationRequest, stream: bool) -> ChatCompletionRequest {
        completion_request(
            request,
            request.model_or(&self.default_model),
            FunctionPartStyle::Structured,
            request.tools().map(wire_tools),
            stream,
        )
    }
}

/// Replace a text-only reply that embeds a tool call with the structured call
fn repair_parts(parts: Vec<Part>) -> Result<Vec<Part>, ProviderError> {
    let repaired = match parts.as_slice() {
        [Part::Text { text }] => repair_text_tool_call(text)?,
        _ => None,
    };
    Ok(repaired.map(|call| vec![call]).unwrap_or(parts))
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new(&ProviderSettings::default())
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &'static str {
        names::OLLAMA
    }

    fn capabilities(&self) -> ProviderCapabilities {
        Self::static_capabilities()
    }

    fn endpoint(&self) -> Option<String> {
        Some(self.base_url.clone())
    }

    async fn is_available(&self) -> bool {
        probe(
            &self.http_client,
            self.name(),
            &format!("{}/api/tags", self.base_url),
        )
        .await
    }

    async fn list_models(&self) -> Vec<ModelDescriptor> {
        let url = format!("{}/api/tags", self.base_url);
        let response = match self
            .http_client
            .get(&url)
            .timeout(AVAILABILITY_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                log::warn!("Ollama model listing returned {}", resp.status());
                return Vec::new();
            }
            Err(e) => {
                log::warn!("Ollama model listing failed: {}", e);
                return Vec::new();
            }
        };

        let tags: OllamaTagsResponse = match response.json().await {
            Ok(tags) => tags,
            Err(e) => {
                log::warn!("Ollama model listing was not valid JSON: {}", e);
                return Vec::new();
            }
        };

        tags.models
            .into_iter()
            .map(|model| ModelDescriptor {
                supports_vision: Self::is_vision_model(&model.name),
                display_name: model.name.clone(),
                id: model.name,
                context_window: self.context_window,
                supports_streaming: true,
            })
            .collect()
    }

    async fn send_request(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        let body = self.build_request(request, false);
        let response =
            post_chat(&self.http_client, self.name(), &self.base_url, &body, request).await?;
        let mut decoded = decode_completion(read_json_cancellable(response, request).await?)?;

        if !decoded.structured_tool_calls {
            decoded.parts = repair_parts(decoded.parts)?;
        }
        Ok(decoded.into_response(request.model_or(&self.default_model)))
    }

    async fn send_stream_request(
        &self,
        request: &GenerationRequest,
    ) -> Result<ChunkStream, ProviderError> {
        let body = self.build_request(request, true);
        let response =
            post_chat(&self.http_client, self.name(), &self.base_url, &body, request).await?;
        Ok(sse::decode_response(
            self.name(),
            response,
            request.cancellation_token.clone(),
        ))
    }
}
