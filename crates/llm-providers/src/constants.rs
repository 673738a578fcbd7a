//! Shared constants: default endpoints, models and timeouts

use std::time::Duration;

/// Upper bound for a single availability probe
pub const AVAILABILITY_TIMEOUT: Duration = Duration::from_secs(2);

/// Connect timeout applied to the shared HTTP client
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Provider names, in auto-detection priority order
pub mod names {
    pub const OLLAMA: &str = "ollama";
    pub const LMSTUDIO: &str = "lmstudio";
    pub const HUGGINGFACE: &str = "huggingface";
}

/// Defaults applied when the host settings omit a field
pub mod defaults {
    pub const OLLAMA_ENDPOINT: &str = "http://localhost:11434";
    pub const OLLAMA_MODEL: &str = "llama3.2";

    pub const LMSTUDIO_ENDPOINT: &str = "http://localhost:1234";
    pub const LMSTUDIO_MODEL: &str = "local-model";
    /// LM Studio does not report context length per model
    pub const LMSTUDIO_CONTEXT_WINDOW: u32 = 32_768;

    /// Text Generation Inference server started locally
    pub const HUGGINGFACE_LOCAL_ENDPOINT: &str = "http://localhost:8080";
    pub const HUGGINGFACE_HOSTED_URL: &str = "https://api-inference.huggingface.co";
    pub const HUGGINGFACE_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";
}
