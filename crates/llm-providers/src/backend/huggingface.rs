//! Hugging Face backend implementation
//!
//! Either the hosted Inference API (bearer token) or a local Text Generation
//! Inference server (no token). The target is fixed when the adapter is built.
//! Both accept a single prompt string, so the conversation is flattened with
//! a Zephyr-style chat template. There is no model discovery endpoint and no
//! streaming support.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::chat_wire::{function_call_text, function_result_text, OneOrMany};
use super::{
    probe, read_json_cancellable, send_cancellable, ChunkStream, Provider, ProviderCapabilities,
    ProviderError,
};
use crate::config::ProviderSettings;
use crate::constants::{defaults, names};
use crate::types::{
    GenerationRequest, GenerationResponse, ModelDescriptor, Part, Role, StopReason, Turn,
};

/// Where generate calls go
#[derive(Clone, PartialEq, Eq)]
pub enum HostedTarget {
    /// Hosted Inference API, `POST {base_url}/models/{model}`
    Hosted { base_url: String, api_key: String },
    /// Local TGI server, `POST {endpoint}/generate`
    Local { endpoint: String },
}

impl HostedTarget {
    /// Hosted when a credential is configured, local otherwise
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        match settings.credential() {
            Some(api_key) => HostedTarget::Hosted {
                base_url: defaults::HUGGINGFACE_HOSTED_URL.to_string(),
                api_key: api_key.to_string(),
            },
            None => HostedTarget::Local {
                endpoint: settings.endpoint_or(defaults::HUGGINGFACE_LOCAL_ENDPOINT),
            },
        }
    }
}

impl fmt::Debug for HostedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostedTarget::Hosted { base_url, .. } => f
                .debug_struct("Hosted")
                .field("base_url", base_url)
                .field("api_key", &"[REDACTED]")
                .finish(),
            HostedTarget::Local { endpoint } => {
                f.debug_struct("Local").field("endpoint", endpoint).finish()
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    inputs: String,
    parameters: GenerateParameters,
}

#[derive(Debug, Serialize)]
struct GenerateParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_new_tokens: Option<u32>,
    return_full_text: bool,
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    #[serde(default)]
    generated_text: Option<String>,
    #[serde(default)]
    details: Option<GenerationDetails>,
}

#[derive(Debug, Deserialize)]
struct GenerationDetails {
    #[serde(default)]
    finish_reason: Option<String>,
}

/// Models offered without a discovery endpoint: (id, display name, context window)
const CATALOG: &[(&str, &str, u32)] = &[
    (
        "mistralai/Mistral-7B-Instruct-v0.2",
        "Mistral 7B Instruct v0.2",
        32_768,
    ),
    ("HuggingFaceH4/zephyr-7b-beta", "Zephyr 7B Beta", 32_768),
    (
        "meta-llama/Meta-Llama-3-8B-Instruct",
        "Llama 3 8B Instruct",
        8_192,
    ),
    ("google/gemma-7b-it", "Gemma 7B Instruct", 8_192),
];

/// Hugging Face Inference API / TGI adapter
pub struct HuggingFaceProvider {
    http_client: reqwest::Client,
    target: HostedTarget,
    default_model: String,
}

impl HuggingFaceProvider {
    pub fn new(settings: &ProviderSettings) -> Self {
        Self::with_client(super::registry::default_client(), settings)
    }

    pub fn with_client(http_client: reqwest::Client, settings: &ProviderSettings) -> Self {
        Self::with_target(
            http_client,
            HostedTarget::from_settings(settings),
            settings.model_or(defaults::HUGGINGFACE_MODEL),
        )
    }

    /// Create an adapter for an explicit target
    pub fn with_target(
        http_client: reqwest::Client,
        target: HostedTarget,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            target,
            default_model: default_model.into(),
        }
    }

    pub fn static_capabilities() -> ProviderCapabilities {
        ProviderCapabilities {
            streaming: false,
            vision: false,
            tool_calling: false,
        }
    }

    fn generate_url(&self, model: &str) -> String {
        match &self.target {
            HostedTarget::Hosted { base_url, .. } => {
                format!("{}/models/{}", base_url.trim_end_matches('/'), model)
            }
            HostedTarget::Local { endpoint } => format!("{}/generate", endpoint),
        }
    }
}

/// Template delimiter for a role
fn role_tag(role: Role) -> &'static str {
    match role {
        Role::User => "<|user|>",
        Role::Assistant => "<|assistant|>",
    }
}

fn turn_text(turn: &Turn) -> String {
    turn.parts
        .iter()
        .map(|part| match part {
            Part::Text { text } => text.clone(),
            Part::FunctionCall { name, args, .. } => function_call_text(name, args),
            Part::FunctionResult { name, response, .. } => function_result_text(name, response),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Flatten the conversation into one templated prompt
pub fn render_prompt(request: &GenerationRequest) -> String {
    let mut prompt = String::new();

    if let Some(system) = request
        .system_instruction
        .as_deref()
        .filter(|s| !s.is_empty())
    {
        prompt.push_str("<|system|>\n");
        prompt.push_str(system);
        prompt.push_str("</s>\n");
    }

    for turn in &request.conversation {
        prompt.push_str(role_tag(turn.role));
        prompt.push('\n');
        prompt.push_str(&turn_text(turn));
        prompt.push_str("</s>\n");
    }

    prompt.push_str(role_tag(Role::Assistant));
    prompt.push('\n');
    prompt
}

impl Default for HuggingFaceProvider {
    fn default() -> Self {
        Self::new(&ProviderSettings::default())
    }
}

#[async_trait]
impl Provider for HuggingFaceProvider {
    fn name(&self) -> &'static str {
        names::HUGGINGFACE
    }

    fn capabilities(&self) -> ProviderCapabilities {
        Self::static_capabilities()
    }

    fn endpoint(&self) -> Option<String> {
        match &self.target {
            HostedTarget::Hosted { base_url, .. } => Some(base_url.clone()),
            HostedTarget::Local { endpoint } => Some(endpoint.clone()),
        }
    }

    async fn is_available(&self) -> bool {
        match &self.target {
            // A configured token is taken as reachability; no probe is sent.
            HostedTarget::Hosted { .. } => true,
            HostedTarget::Local { endpoint } => {
                probe(&self.http_client, self.name(), &format!("{}/health", endpoint)).await
            }
        }
    }

    async fn list_models(&self) -> Vec<ModelDescriptor> {
        CATALOG
            .iter()
            .map(|(id, display_name, context_window)| ModelDescriptor {
                id: id.to_string(),
                display_name: display_name.to_string(),
                context_window: Some(*context_window),
                supports_streaming: false,
                supports_vision: false,
            })
            .collect()
    }

    async fn send_request(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        let model = request.model_or(&self.default_model);

        let body = GenerateRequest {
            inputs: render_prompt(request),
            parameters: GenerateParameters {
                temperature: request.temperature,
                max_new_tokens: request.max_output_tokens,
                return_full_text: false,
            },
        };

        let mut builder = self.http_client.post(self.generate_url(&model)).json(&body);
        if let HostedTarget::Hosted { api_key, .. } = &self.target {
            builder = builder.bearer_auth(api_key);
        }

        let response = send_cancellable(builder, request).await?;
        if !response.status().is_success() {
            return Err(ProviderError::rejected(self.name(), response).await);
        }

        let envelope: OneOrMany<GeneratedText> = read_json_cancellable(response, request).await?;
        let generated = envelope
            .into_first()
            .ok_or_else(|| ProviderError::Decode("Empty generation envelope".to_string()))?;

        let stop_reason = generated
            .details
            .and_then(|d| d.finish_reason)
            .map(|reason| StopReason::from_finish_reason(&reason))
            .unwrap_or(StopReason::Stop);

        Ok(GenerationResponse {
            output_turn: Turn::assistant(generated.generated_text.unwrap_or_default()),
            stop_reason,
            index: 0,
            model,
        })
    }

    async fn send_stream_request(
        &self,
        _request: &GenerationRequest,
    ) -> Result<ChunkStream, ProviderError> {
        Err(ProviderError::StreamingNotSupported {
            provider: self.name().to_string(),
        })
    }
}
