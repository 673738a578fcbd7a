//! Pluggable provider abstraction
//!
//! Every local inference server (Ollama, LM Studio, Hugging Face TGI) is wrapped
//! in an adapter implementing [`Provider`]. Application code talks to the trait
//! and never needs to know which server answered.

pub mod registry;

mod chat_wire;
mod sse;
mod tool_repair;

pub mod huggingface;
pub mod lmstudio;
pub mod ollama;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use serde::{Deserialize, Serialize};

use crate::constants::AVAILABILITY_TIMEOUT;
use crate::types::{GenerationRequest, GenerationResponse, ModelDescriptor, StreamChunk};

pub use huggingface::{HostedTarget, HuggingFaceProvider};
pub use lmstudio::LmStudioProvider;
pub use ollama::OllamaProvider;
pub use registry::ProviderKind;

/// Error types for provider operations
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider} rejected the request: {status} {status_text}: {body}")]
    Rejected {
        provider: String,
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} does not support streaming")]
    StreamingNotSupported { provider: String },

    #[error("{provider} reported an error mid-stream: {message}")]
    StreamFailed { provider: String, message: String },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    /// Build a `Rejected` error from a non-success response, consuming its body
    pub(crate) async fn rejected(provider: &str, response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Self::Rejected {
            provider: provider.to_string(),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            body,
        }
    }
}

/// Static capability flags declared by an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderCapabilities {
    /// Supports incremental token output
    pub streaming: bool,
    /// Some exposed models accept images
    pub vision: bool,
    /// Accepts function declarations and returns structured calls
    pub tool_calling: bool,
}

/// Stream of response chunks returned by [`Provider::send_stream_request`]
///
/// Finite and not restartable. Dropping it releases the underlying connection.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, ProviderError>> + Send>>;

/// The contract every provider adapter implements.
///
/// Reachability problems never escape `is_available` or `list_models`;
/// request-time failures are returned as [`ProviderError`].
#[async_trait]
pub trait Provider: Send + Sync {
    // ─── IDENTITY ───────────────────────────────────────────────────

    /// Stable identifier (e.g. "ollama")
    fn name(&self) -> &'static str;

    /// What this provider supports
    fn capabilities(&self) -> ProviderCapabilities;

    fn supports_streaming(&self) -> bool {
        self.capabilities().streaming
    }

    fn supports_vision(&self) -> bool {
        self.capabilities().vision
    }

    /// Base URL requests are sent to
    fn endpoint(&self) -> Option<String>;

    // ─── DISCOVERY ──────────────────────────────────────────────────

    /// Bounded reachability check; false on error, bad status or timeout
    async fn is_available(&self) -> bool;

    /// Models currently exposed; empty on any failure
    async fn list_models(&self) -> Vec<ModelDescriptor>;

    // ─── GENERATION ─────────────────────────────────────────────────

    /// One blocking round trip
    async fn send_request(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError>;

    /// Lazily streamed response
    async fn send_stream_request(
        &self,
        request: &GenerationRequest,
    ) -> Result<ChunkStream, ProviderError>;
}

/// GET `url` with the availability timeout and report whether it succeeded
pub(crate) async fn probe(client: &reqwest::Client, provider: &str, url: &str) -> bool {
    match client.get(url).timeout(AVAILABILITY_TIMEOUT).send().await {
        Ok(resp) if resp.status().is_success() => true,
        Ok(resp) => {
            log::debug!("{} probe {} returned {}", provider, url, resp.status());
            false
        }
        Err(e) => {
            log::debug!("{} probe {} failed: {}", provider, url, e);
            false
        }
    }
}

/// Send a request, aborting early when the caller's token is cancelled
pub(crate) async fn send_cancellable(
    builder: reqwest::RequestBuilder,
    request: &GenerationRequest,
) -> Result<reqwest::Response, ProviderError> {
    match &request.cancellation_token {
        Some(token) => tokio::select! {
            _ = token.cancelled() => Err(ProviderError::Cancelled),
            result = builder.send() => result.map_err(ProviderError::Http),
        },
        None => builder.send().await.map_err(ProviderError::Http),
    }
}

/// Read a JSON body, aborting early when the caller's token is cancelled
pub(crate) async fn read_json_cancellable<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    request: &GenerationRequest,
) -> Result<T, ProviderError> {
    let bytes = match &request.cancellation_token {
        Some(token) => tokio::select! {
            _ = token.cancelled() => return Err(ProviderError::Cancelled),
            result = response.bytes() => result?,
        },
        None => response.bytes().await?,
    };
    serde_json::from_slice(&bytes)
        .map_err(|e| ProviderError::Decode(format!("Invalid response JSON: {}", e)))
}
