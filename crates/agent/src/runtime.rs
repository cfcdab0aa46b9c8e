use std::sync::Arc;
use std::time::Duration;

use glowie_core::pricing::{DeterministicPricingEngine, PricingEngine};
use glowie_core::{
    DelayPredictionRequest, DelayPredictionResponse, DeliveryResult, DocumentRequest,
    DocumentResponse, NotificationRequest, QuoteInput, QuoteResult, RouteRequest, RouteResponse,
    SupportRequest, SupportResponse,
};

use crate::cache::{Cache, NoopCache};
use crate::delay::DelayAgent;
use crate::document::DocumentAgent;
use crate::guardrails::PricingGuardrail;
use crate::llm::{CompletionClient, OfflineCompletionClient};
use crate::notification::{NotificationDispatcher, PendingNotificationDispatcher};
use crate::prompts::{PromptError, PromptLibrary};
use crate::quote::{QuoteError, QuotePipeline};
use crate::record_store::{InMemoryRecordStore, RecordStore};
use crate::route::RouteAgent;
use crate::support::SupportAgent;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Collaborators the runtime is assembled from.
pub struct RuntimeServices {
    pub completion: Arc<dyn CompletionClient>,
    pub records: Arc<dyn RecordStore>,
    pub cache: Arc<dyn Cache>,
    pub cache_ttl: Duration,
    pub notifier: Arc<dyn NotificationDispatcher>,
    pub pricing: Arc<dyn PricingEngine>,
    pub guardrail: PricingGuardrail,
}

impl RuntimeServices {
    /// No completion provider, records kept in memory, no cache.
    pub fn offline() -> Self {
        Self {
            completion: Arc::new(OfflineCompletionClient),
            records: Arc::new(InMemoryRecordStore::new()),
            cache: Arc::new(NoopCache),
            cache_ttl: DEFAULT_CACHE_TTL,
            notifier: Arc::new(PendingNotificationDispatcher),
            pricing: Arc::new(DeterministicPricingEngine::default()),
            guardrail: PricingGuardrail::default(),
        }
    }
}

/// Application context shared by every request. Everything it holds is
/// read-only after construction.
pub struct AgentRuntime {
    completion: Arc<dyn CompletionClient>,
    records: Arc<dyn RecordStore>,
    cache: Arc<dyn Cache>,
    cache_ttl: Duration,
    notifier: Arc<dyn NotificationDispatcher>,
    quotes: QuotePipeline,
    route: RouteAgent,
    delay: DelayAgent,
    document: DocumentAgent,
    support: SupportAgent,
}

impl AgentRuntime {
    pub fn new(services: RuntimeServices) -> Result<Self, PromptError> {
        let prompts = Arc::new(PromptLibrary::embedded()?);
        Ok(Self {
            quotes: QuotePipeline::new(services.pricing, prompts.clone(), services.guardrail),
            route: RouteAgent::new(prompts.clone()),
            delay: DelayAgent::new(prompts.clone()),
            document: DocumentAgent,
            support: SupportAgent::new(prompts),
            completion: services.completion,
            records: services.records,
            cache: services.cache,
            cache_ttl: services.cache_ttl,
            notifier: services.notifier,
        })
    }

    pub fn completion_provider(&self) -> &str {
        self.completion.name()
    }

    pub async fn generate_quote(&self, input: QuoteInput) -> Result<QuoteResult, QuoteError> {
        self.quotes.run(input, self.completion.as_ref(), self.records.as_ref()).await
    }

    pub async fn optimize_route(&self, request: &RouteRequest) -> RouteResponse {
        self.route
            .optimize(self.completion.as_ref(), self.cache.as_ref(), self.cache_ttl, request)
            .await
    }

    pub async fn predict_delay(&self, request: &DelayPredictionRequest) -> DelayPredictionResponse {
        self.delay.predict(self.completion.as_ref(), request).await
    }

    pub async fn process_document(&self, request: &DocumentRequest) -> DocumentResponse {
        self.document.extract(self.completion.as_ref(), request).await
    }

    pub async fn answer_support(&self, request: SupportRequest) -> SupportResponse {
        self.support.respond(self.completion.as_ref(), self.records.as_ref(), request).await
    }

    pub async fn notify(&self, request: &NotificationRequest) -> DeliveryResult {
        self.notifier.dispatch(&request.event_type, &request.payload).await
    }
}
