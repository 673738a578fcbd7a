//! Provider manager against mock servers for every adapter.

use llm_providers::{Preference, ProviderConfig, ProviderManager, ProviderSettings};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Servers {
    ollama: MockServer,
    lmstudio: MockServer,
    huggingface: MockServer,
}

impl Servers {
    async fn start() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        Self {
            ollama: MockServer::start().await,
            lmstudio: MockServer::start().await,
            huggingface: MockServer::start().await,
        }
    }

    fn config(&self, preferred: Preference) -> ProviderConfig {
        let settings = |server: &MockServer| ProviderSettings {
            endpoint: Some(server.uri()),
            ..Default::default()
        };
        ProviderConfig {
            preferred,
            ollama: settings(&self.ollama),
            lmstudio: settings(&self.lmstudio),
            huggingface: settings(&self.huggingface),
        }
    }

    async fn ollama_up(&self) {
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{ "name": "llama3.2:latest" }]
            })))
            .mount(&self.ollama)
            .await;
    }

    async fn lmstudio_up(&self) {
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "id": "qwen2.5-7b-instruct" }]
            })))
            .mount(&self.lmstudio)
            .await;
    }

    async fn huggingface_up(&self) {
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.huggingface)
            .await;
    }
}

#[tokio::test]
async fn test_auto_detect_follows_priority() {
    let servers = Servers::start().await;
    servers.lmstudio_up().await;
    servers.huggingface_up().await;

    let manager = ProviderManager::new(servers.config(Preference::Auto));
    let active = manager.get_active_provider().await.unwrap();
    assert_eq!(active.name(), "lmstudio");

    servers.ollama_up().await;
    let active = manager.get_active_provider().await.unwrap();
    assert_eq!(active.name(), "ollama");
}

#[tokio::test]
async fn test_preferred_provider_wins_when_available() {
    let servers = Servers::start().await;
    servers.ollama_up().await;
    servers.huggingface_up().await;

    let manager = ProviderManager::new(servers.config(Preference::from("huggingface".to_string())));
    let active = manager.get_active_provider().await.unwrap();
    assert_eq!(active.name(), "huggingface");
}

#[tokio::test]
async fn test_preferred_provider_falls_back_when_down() {
    let servers = Servers::start().await;
    servers.lmstudio_up().await;

    let manager = ProviderManager::new(servers.config(Preference::Named("ollama".to_string())));
    let active = manager.get_active_provider().await.unwrap();
    assert_eq!(active.name(), "lmstudio");
}

#[tokio::test]
async fn test_nothing_running() {
    let servers = Servers::start().await;
    let manager = ProviderManager::new(servers.config(Preference::Auto));
    assert!(manager.get_active_provider().await.is_none());
}

#[tokio::test]
async fn test_detect_reports_every_provider() {
    let servers = Servers::start().await;
    servers.ollama_up().await;

    let manager = ProviderManager::new(servers.config(Preference::Auto));
    let descriptors = manager.detect_providers().await;

    assert_eq!(descriptors.len(), 3);
    assert_eq!(descriptors[0].name, "ollama");
    assert!(descriptors[0].available);
    assert_eq!(descriptors[0].models[0].id, "llama3.2:latest");
    assert_eq!(descriptors[0].endpoint.as_deref(), Some(servers.ollama.uri().as_str()));

    assert!(!descriptors[1].available);
    assert!(descriptors[1].models.is_empty());
    assert!(!descriptors[2].available);
    assert!(descriptors[2].models.is_empty());
}

#[tokio::test]
async fn test_disabled_provider_never_probed() {
    let servers = Servers::start().await;
    servers.ollama_up().await;
    servers.lmstudio_up().await;

    let mut config = servers.config(Preference::Auto);
    config.ollama.enabled = Some(false);

    let manager = ProviderManager::new(config);
    assert!(manager.get_provider("ollama").is_none());

    let active = manager.get_active_provider().await.unwrap();
    assert_eq!(active.name(), "lmstudio");
    assert_eq!(manager.detect_providers().await.len(), 2);
    assert!(servers.ollama.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_config_from_host_json() {
    let servers = Servers::start().await;
    servers.huggingface_up().await;

    let config = ProviderConfig::from_json(json!({
        "preferred": "HuggingFace",
        "ollama": { "enabled": false },
        "lmstudio": { "enabled": false },
        "huggingface": { "endpoint": servers.huggingface.uri() }
    }))
    .unwrap();

    let manager = ProviderManager::new(config);
    assert_eq!(manager.provider_names(), vec!["huggingface"]);
    assert_eq!(
        manager.get_active_provider().await.map(|p| p.name()),
        Some("huggingface")
    );
}
