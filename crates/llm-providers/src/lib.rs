//! Unified access to local LLM servers
//!
//! This library wraps different inference servers behind one [`Provider`] trait:
//! - **Ollama**: native chat server with tool calling and streaming
//! - **LM Studio**: any OpenAI-compatible local server
//! - **Hugging Face**: hosted Inference API or a local TGI server
//!
//! A [`ProviderManager`] probes the configured servers and picks the one to use.
//!
//! # Example
//!
//! ```rust,ignore
//! use futures_util::StreamExt;
//! use llm_providers::{GenerationRequest, ProviderConfig, ProviderManager, Turn};
//!
//! let manager = ProviderManager::new(ProviderConfig::default());
//!
//! if let Some(provider) = manager.get_active_provider().await {
//!     let request = GenerationRequest::new(vec![Turn::user("Hello!")]);
//!     let mut stream = provider.send_stream_request(&request).await?;
//!     while let Some(chunk) = stream.next().await {
//!         print!("{}", chunk?.text());
//!     }
//! }
//! ```

pub mod backend;
pub mod config;
pub mod constants;
pub mod manager;
pub mod types;

// Re-exports for convenience
pub use backend::{
    ChunkStream, HostedTarget, HuggingFaceProvider, LmStudioProvider, OllamaProvider, Provider,
    ProviderCapabilities, ProviderError, ProviderKind,
};
pub use config::{Preference, ProviderConfig, ProviderSettings};
pub use manager::{ProviderManager, SharedProviderManager};
pub use types::{
    GenerationRequest, GenerationResponse, ModelDescriptor, Part, ProviderDescriptor, Role,
    StopReason, StreamChunk, ToolDeclaration, Turn,
};
