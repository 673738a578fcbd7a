//! Provider Manager - detection and selection across configured providers
//!
//! The manager owns one adapter per enabled provider, built once from the
//! configuration. It probes them, aggregates their model listings and picks
//! the provider the host should talk to, falling back to auto-detection when
//! an explicit preference is not reachable.

use std::sync::Arc;

use futures_util::future::join_all;

use crate::backend::registry::{build_providers, priority_rank};
use crate::backend::Provider;
use crate::config::{Preference, ProviderConfig};
use crate::types::ProviderDescriptor;

/// Single entry point for provider detection and selection.
///
/// Holds no mutable state: the adapter list and preference are fixed at
/// construction, and every detection call is recomputed from live probes.
pub struct ProviderManager {
    preference: Preference,
    /// Adapters in priority order, at most one per name
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderManager {
    /// Build one adapter per provider not explicitly disabled
    pub fn new(config: ProviderConfig) -> Self {
        let providers = build_providers(&config);
        log::info!(
            "Provider manager configured with [{}], preference {:?}",
            providers
                .iter()
                .map(|p| p.name())
                .collect::<Vec<_>>()
                .join(", "),
            config.preferred
        );
        Self {
            preference: config.preferred,
            providers,
        }
    }

    /// Use caller-supplied adapters
    ///
    /// Adapters are ordered by provider priority (unknown names last, in the
    /// order given); a repeated name keeps only its first adapter.
    pub fn with_providers(preference: Preference, providers: Vec<Arc<dyn Provider>>) -> Self {
        let mut unique: Vec<Arc<dyn Provider>> = Vec::with_capacity(providers.len());
        for provider in providers {
            if unique.iter().any(|p| p.name() == provider.name()) {
                log::warn!("Ignoring duplicate provider {}", provider.name());
                continue;
            }
            unique.push(provider);
        }
        unique.sort_by_key(|p| priority_rank(p.name()));

        Self {
            preference,
            providers: unique,
        }
    }

    pub fn preference(&self) -> &Preference {
        &self.preference
    }

    /// Names of the configured providers, in priority order
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Direct lookup without an availability check
    pub fn get_provider(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(name.trim()))
            .cloned()
    }

    // ─── DETECTION ──────────────────────────────────────────────────

    /// Probe every provider concurrently; one descriptor per provider
    pub async fn detect_providers(&self) -> Vec<ProviderDescriptor> {
        join_all(self.providers.iter().map(|p| describe(p.as_ref()))).await
    }

    /// First available provider in priority order
    pub async fn auto_detect_provider(&self) -> Option<Arc<dyn Provider>> {
        for provider in &self.providers {
            if provider.is_available().await {
                log::info!("Auto-detected provider: {}", provider.name());
                return Some(provider.clone());
            }
        }
        log::info!("No local provider available");
        None
    }

    /// Provider the host should use right now
    ///
    /// A named preference that is unknown or unreachable degrades to
    /// auto-detection. `Cloud` selects no local provider.
    pub async fn get_active_provider(&self) -> Option<Arc<dyn Provider>> {
        match &self.preference {
            Preference::Auto => self.auto_detect_provider().await,
            Preference::Cloud => {
                log::debug!("Cloud preference set; no local provider selected");
                None
            }
            Preference::Named(name) => {
                if let Some(provider) = self.get_provider(name) {
                    if provider.is_available().await {
                        log::info!("Using preferred provider: {}", provider.name());
                        return Some(provider);
                    }
                    log::warn!(
                        "Preferred provider {} is not available, falling back to auto-detection",
                        name
                    );
                } else {
                    log::warn!(
                        "Preferred provider {} is not configured, falling back to auto-detection",
                        name
                    );
                }
                self.auto_detect_provider().await
            }
        }
    }
}

async fn describe(provider: &dyn Provider) -> ProviderDescriptor {
    let available = provider.is_available().await;
    let models = if available {
        provider.list_models().await
    } else {
        Vec::new()
    };
    log::debug!(
        "Provider {} available={} models={}",
        provider.name(),
        available,
        models.len()
    );

    ProviderDescriptor {
        name: provider.name().to_string(),
        endpoint: provider.endpoint(),
        available,
        models,
    }
}

/// Shared manager type for application state
pub type SharedProviderManager = Arc<ProviderManager>;
