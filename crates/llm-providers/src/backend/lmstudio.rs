//! LM Studio backend implementation
//!
//! Works with any server exposing the OpenAI `/v1` surface. No tools are
//! declared and function parts travel as plain text, so there is nothing to
//! repair on the way back.

use async_trait::async_trait;
use serde::Deserialize;

use super::chat_wire::{
    completion_request, decode_completion, post_chat, ChatCompletionRequest, FunctionPartStyle,
};
use super::{
    probe, read_json_cancellable, sse, ChunkStream, Provider, ProviderCapabilities,
    ProviderError,
};
use crate::config::{lmstudio_context_window, ProviderSettings};
use crate::constants::{defaults, names, AVAILABILITY_TIMEOUT};
use crate::types::{GenerationRequest, GenerationResponse, ModelDescriptor};

/// Entry of the `/v1/models` listing
#[derive(Debug, Clone, Deserialize)]
struct OpenAiModel {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<OpenAiModel>,
}

/// LM Studio (OpenAI-compatible) adapter
pub struct LmStudioProvider {
    http_client: reqwest::Client,
    base_url: String,
    default_model: String,
    /// Attached to every listed model
    context_window: u32,
}

impl LmStudioProvider {
    pub fn new(settings: &ProviderSettings) -> Self {
        Self::with_client(super::registry::default_client(), settings)
    }

    pub fn with_client(http_client: reqwest::Client, settings: &ProviderSettings) -> Self {
        Self {
            http_client,
            base_url: settings.endpoint_or(defaults::LMSTUDIO_ENDPOINT),
            default_model: settings.model_or(defaults::LMSTUDIO_MODEL),
            context_window: lmstudio_context_window(settings),
        }
    }

    pub fn static_capabilities() -> ProviderCapabilities {
        ProviderCapabilities {
            streaming: true,
            vision: false,
            tool_calling: false,
        }
    }

    fn build_request(&self, request: &GenerationRequest, stream: bool) -> ChatCompletionRequest {
        completion_request(
            request,
            request.model_or(&self.default_model),
            FunctionPartStyle::Textual,
            None,
            stream,
        )
    }

    fn describe(&self, model: OpenAiModel) -> ModelDescriptor {
        ModelDescriptor {
            display_name: model.id.clone(),
            id: model.id,
            context_window: Some(self.context_window),
            supports_streaming: true,
            supports_vision: false,
        }
    }
}

impl Default for LmStudioProvider {
    fn default() -> Self {
        Self::new(&ProviderSettings::default())
    }
}

#[async_trait]
impl Provider for LmStudioProvider {
    fn name(&self) -> &'static str {
        names::LMSTUDIO
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
            &format!("{}/v1/models", self.base_url),
        )
        .await
    }

    async fn list_models(&self) -> Vec<ModelDescriptor> {
        let url = format!("{}/v1/models", self.base_url);
        let listing: ModelsResponse = match self
            .http_client
            .get(&url)
            .timeout(AVAILABILITY_TIMEOUT)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
        {
            Ok(resp) => match resp.json().await {
                Ok(listing) => listing,
                Err(e) => {
                    log::warn!("LM Studio model listing was not valid JSON: {}", e);
                    return Vec::new();
                }
            },
            Err(e) => {
                log::warn!("LM Studio model listing failed: {}", e);
                return Vec::new();
            }
        };

        listing
            .data
            .into_iter()
            .map(|model| self.describe(model))
            .collect()
    }

    async fn send_request(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        let body = self.build_request(request, false);
        let response =
            post_chat(&self.http_client, self.name(), &self.base_url, &body, request).await?;
        let decoded = decode_completion(read_json_cancellable(response, request).await?)?;
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
