//! The closed set of provider variants
//!
//! Adding a backend means adding a [`ProviderKind`] variant and its adapter;
//! the manager's selection logic only walks [`ProviderKind::PRIORITY`].

use std::fmt;
use std::sync::Arc;

use super::{
    HuggingFaceProvider, LmStudioProvider, OllamaProvider, Provider, ProviderCapabilities,
};
use crate::config::{ProviderConfig, ProviderSettings};
use crate::constants::{names, CONNECT_TIMEOUT};

/// Known provider variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Ollama,
    LmStudio,
    HuggingFace,
}

impl ProviderKind {
    /// Auto-detection order: full tool calling and streaming first
    pub const PRIORITY: [ProviderKind; 3] = [
        ProviderKind::Ollama,
        ProviderKind::LmStudio,
        ProviderKind::HuggingFace,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::Ollama => names::OLLAMA,
            ProviderKind::LmStudio => names::LMSTUDIO,
            ProviderKind::HuggingFace => names::HUGGINGFACE,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::PRIORITY
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Position in [`Self::PRIORITY`]
    pub fn rank(self) -> usize {
        match self {
            ProviderKind::Ollama => 0,
            ProviderKind::LmStudio => 1,
            ProviderKind::HuggingFace => 2,
        }
    }

    /// Capabilities without building an adapter
    pub fn static_capabilities(self) -> ProviderCapabilities {
        match self {
            ProviderKind::Ollama => OllamaProvider::static_capabilities(),
            ProviderKind::LmStudio => LmStudioProvider::static_capabilities(),
            ProviderKind::HuggingFace => HuggingFaceProvider::static_capabilities(),
        }
    }

    /// Settings block for this variant
    pub fn settings(self, config: &ProviderConfig) -> &ProviderSettings {
        match self {
            ProviderKind::Ollama => &config.ollama,
            ProviderKind::LmStudio => &config.lmstudio,
            ProviderKind::HuggingFace => &config.huggingface,
        }
    }

    /// Build the adapter for this variant
    pub fn create(
        self,
        http_client: reqwest::Client,
        settings: &ProviderSettings,
    ) -> Arc<dyn Provider> {
        match self {
            ProviderKind::Ollama => Arc::new(OllamaProvider::with_client(http_client, settings)),
            ProviderKind::LmStudio => {
                Arc::new(LmStudioProvider::with_client(http_client, settings))
            }
            ProviderKind::HuggingFace => {
                Arc::new(HuggingFaceProvider::with_client(http_client, settings))
            }
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Priority rank for any provider name; unknown names sort last
pub(crate) fn priority_rank(name: &str) -> usize {
    ProviderKind::from_name(name)
        .map(ProviderKind::rank)
        .unwrap_or(usize::MAX)
}

/// HTTP client shared by adapters built from one configuration
pub(crate) fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .unwrap_or_default()
}

/// One adapter per enabled variant, in priority order
pub(crate) fn build_providers(config: &ProviderConfig) -> Vec<Arc<dyn Provider>> {
    let http_client = default_client();
    ProviderKind::PRIORITY
        .into_iter()
        .filter_map(|kind| {
            let settings = kind.settings(config);
            if settings.is_enabled() {
                Some(kind.create(http_client.clone(), settings))
            } else {
                log::debug!("Provider {} disabled by configuration", kind);
                None
            }
        })
        .collect()
}
