use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use axum::Router;
use glowie_agent::cache::{Cache, InMemoryCache, NoopCache};
use glowie_agent::guardrails::PricingGuardrail;
use glowie_agent::llm::{OpenAiCompatClient, ProviderError};
use glowie_agent::notification::PendingNotificationDispatcher;
use glowie_agent::prompts::PromptError;
use glowie_agent::record_store::{HttpRecordStore, PersistenceError};
use glowie_agent::{AgentRuntime, RuntimeServices};
use glowie_core::config::{AppConfig, ConfigError, LoadOptions};
use glowie_core::pricing::DeterministicPricingEngine;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{agents, health};

pub struct Application {
    pub config: AppConfig,
    pub runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("completion client setup failed: {0}")]
    Completion(#[from] ProviderError),
    #[error("record store setup failed: {0}")]
    RecordStore(#[from] PersistenceError),
    #[error("prompt templates failed to load: {0}")]
    Prompts(#[from] PromptError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        environment = %config.app.environment,
        "starting application bootstrap"
    );

    let completion = OpenAiCompatClient::from_config(&config.llm)?;
    info!(
        event_name = "system.bootstrap.completion_ready",
        provider = config.llm.provider.as_str(),
        model = %config.llm.model,
        endpoint = %completion.endpoint(),
        "completion client configured"
    );

    let records = HttpRecordStore::from_config(&config.backend)?;
    let cache: Arc<dyn Cache> =
        if config.cache.enabled { Arc::new(InMemoryCache::new()) } else { Arc::new(NoopCache) };

    let runtime = AgentRuntime::new(RuntimeServices {
        completion: Arc::new(completion),
        records: Arc::new(records),
        cache,
        cache_ttl: Duration::from_secs(config.cache.ttl_secs),
        notifier: Arc::new(PendingNotificationDispatcher),
        pricing: Arc::new(DeterministicPricingEngine::default()),
        guardrail: PricingGuardrail::default(),
    })?;

    info!(
        event_name = "system.bootstrap.complete",
        cache_enabled = config.cache.enabled,
        backend = %config.backend.base_url,
        "application bootstrap complete"
    );

    Ok(Application { config, runtime: Arc::new(runtime) })
}

impl Application {
    pub fn router(&self) -> Router {
        Router::new()
            .merge(health::router(&self.config.app))
            .merge(agents::router(self.runtime.clone()))
            .layer(cors_layer(&self.config.server.allowed_origins))
            .layer(TraceLayer::new_for_http())
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(event_name = "system.bootstrap.cors_origin_invalid", origin = %origin, "ignoring CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}
