//! Configuration types for the provider manager
//!
//! The host application owns settings loading and merging. This module only
//! describes the value it hands over and the defaults applied to missing
//! optional fields.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::backend::ProviderError;
use crate::constants::defaults;

/// Which provider the host would like to use
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Preference {
    /// Pick the first available local provider in priority order
    #[default]
    Auto,
    /// The host talks to its cloud model; no local provider is selected
    Cloud,
    /// A specific local provider, by name
    Named(String),
}

impl From<String> for Preference {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Preference::Auto,
            "cloud" => Preference::Cloud,
            other => Preference::Named(other.to_string()),
        }
    }
}

impl From<Preference> for String {
    fn from(value: Preference) -> Self {
        match value {
            Preference::Auto => "auto".to_string(),
            Preference::Cloud => "cloud".to_string(),
            Preference::Named(name) => name,
        }
    }
}

/// Per-provider settings block
///
/// Every field is optional; the adapters fall back to `constants::defaults`.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderSettings {
    /// Only an explicit `false` disables the provider
    pub enabled: Option<bool>,
    pub endpoint: Option<String>,
    pub default_model: Option<String>,
    pub context_window: Option<u32>,
    pub api_key: Option<String>,
}

impl ProviderSettings {
    pub fn is_enabled(&self) -> bool {
        self.enabled != Some(false)
    }

    /// Configured endpoint without a trailing slash, or `default`
    pub fn endpoint_or(&self, default: &str) -> String {
        self.endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn model_or(&self, default: &str) -> String {
        self.default_model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(default)
            .to_string()
    }

    /// Configured credential, ignoring blank values
    pub fn credential(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("enabled", &self.enabled)
            .field("endpoint", &self.endpoint)
            .field("default_model", &self.default_model)
            .field("context_window", &self.context_window)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Static input to [`crate::ProviderManager`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderConfig {
    pub preferred: Preference,
    pub ollama: ProviderSettings,
    pub lmstudio: ProviderSettings,
    pub huggingface: ProviderSettings,
}

impl ProviderConfig {
    /// Parse the JSON value produced by the host settings loader
    pub fn from_json(value: serde_json::Value) -> Result<Self, ProviderError> {
        serde_json::from_value(value)
            .map_err(|e| ProviderError::Config(format!("Invalid provider settings: {}", e)))
    }
}

/// Resolved context window for LM Studio models
pub(crate) fn lmstudio_context_window(settings: &ProviderSettings) -> u32 {
    settings
        .context_window
        .unwrap_or(defaults::LMSTUDIO_CONTEXT_WINDOW)
}
