use std::sync::Arc;
use std::time::Duration;

use glowie_core::{RouteOptimization, RouteRequest, RouteResponse};
use tracing::{debug, info};

use crate::cache::Cache;
use crate::extract::{extract_typed, ParseError};
use crate::llm::{CompletionClient, CompletionRequest};
use crate::prompts::{PromptError, PromptLibrary};
use crate::single_call::{run_single_call, AgentOutcome, OutcomeSource, SingleCallAgent};

struct StaticRoute {
    origin: &'static str,
    route: &'static str,
    days: u32,
    cost: &'static str,
}

const STATIC_ROUTES: [StaticRoute; 3] = [
    StaticRoute {
        origin: "japan",
        route: "Yokohama/Tokyo → Mombasa → Port Bell",
        days: 40,
        cost: "$2,500 - $3,500",
    },
    StaticRoute {
        origin: "uk",
        route: "Southampton → Mombasa → Port Bell",
        days: 35,
        cost: "$3,000 - $4,000",
    },
    StaticRoute {
        origin: "uae",
        route: "Dubai → Mombasa → Port Bell",
        days: 30,
        cost: "$2,000 - $3,000",
    },
];

pub struct RouteAgent {
    prompts: Arc<PromptLibrary>,
}

impl RouteAgent {
    pub fn new(prompts: Arc<PromptLibrary>) -> Self {
        Self { prompts }
    }

    /// Cached model answers are served without a provider call; fresh model
    /// answers are written back for `ttl`.
    pub async fn optimize(
        &self,
        client: &dyn CompletionClient,
        cache: &dyn Cache,
        ttl: Duration,
        request: &RouteRequest,
    ) -> RouteResponse {
        let key = request.cache_key();
        if let Some(cached) = cache.get(&key).await {
            match serde_json::from_value::<RouteOptimization>(cached) {
                Ok(optimization) => {
                    debug!(event_name = "agent.route.cache_hit", key = %key, "route served from cache");
                    return to_response(
                        request,
                        AgentOutcome::succeeded(optimization, OutcomeSource::Cache),
                    );
                }
                Err(_) => {
                    cache.delete(&key).await;
                }
            }
        }

        let outcome = run_single_call(self, client, request).await;
        if outcome.source == OutcomeSource::Model {
            if let Ok(value) = serde_json::to_value(&outcome.payload) {
                cache.set(&key, value, ttl).await;
            }
        }

        info!(
            event_name = "agent.route.completed",
            shipment_id = request.shipment_id,
            success = outcome.success,
            source = ?outcome.source,
            "route optimization finished"
        );
        to_response(request, outcome)
    }
}

fn to_response(request: &RouteRequest, outcome: AgentOutcome<RouteOptimization>) -> RouteResponse {
    RouteResponse {
        success: outcome.success,
        shipment_id: request.shipment_id,
        optimization: Some(outcome.payload),
        error: outcome.error,
    }
}

impl SingleCallAgent for RouteAgent {
    type Input = RouteRequest;
    type Payload = RouteOptimization;

    fn name(&self) -> &'static str {
        "route"
    }

    fn request(&self, input: &RouteRequest) -> Result<CompletionRequest, PromptError> {
        Ok(CompletionRequest::text(self.prompts.route_optimization(input)?))
    }

    fn strict(&self, reply: &str) -> Result<RouteOptimization, ParseError> {
        let mut optimization: RouteOptimization = extract_typed(reply)?;
        if !optimization.confidence_score.is_finite() {
            return Err(ParseError::InvalidNumber {
                field: "confidence_score",
                value: optimization.confidence_score.to_string(),
            });
        }
        optimization.confidence_score = optimization.confidence_score.clamp(0.0, 1.0);
        Ok(optimization)
    }

    fn heuristic(&self, input: &RouteRequest, _reply: &str) -> RouteOptimization {
        RouteOptimization {
            recommended_route: format!("{} → Port Bell, Uganda", input.origin),
            transit_time_days: 40,
            cost_range: "$2,500 - $3,500".to_string(),
            alternative_routes: Vec::new(),
            reasoning: "Standard route based on typical shipping patterns".to_string(),
            confidence_score: 0.6,
        }
    }

    fn fallback(&self, input: &RouteRequest) -> RouteOptimization {
        let origin = input.origin.trim().to_lowercase();
        let route = STATIC_ROUTES
            .iter()
            .find(|route| route.origin == origin)
            .unwrap_or(&STATIC_ROUTES[0]);

        RouteOptimization {
            recommended_route: route.route.to_string(),
            transit_time_days: route.days,
            cost_range: route.cost.to_string(),
            alternative_routes: Vec::new(),
            reasoning: "Standard route for this origin".to_string(),
            confidence_score: 0.7,
        }
    }
}
