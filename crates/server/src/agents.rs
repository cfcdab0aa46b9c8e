//! Agent endpoints.
//!
//! - `POST /agents/quote`            — run the quote pipeline
//! - `POST /agents/route`            — route optimization
//! - `POST /agents/document`         — document field extraction
//! - `POST /agents/support`          — customer support answer
//! - `POST /agents/delay-prediction` — delay risk prediction
//! - `POST /agents/notify`           — notification dispatch
//!
//! Only the quote endpoint can answer with an error status; the other agents
//! report failure inside their response body.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use glowie_agent::quote::QuoteError;
use glowie_agent::AgentRuntime;
use glowie_core::errors::{ApplicationError, InterfaceError};
use glowie_core::{
    DelayPredictionRequest, DelayPredictionResponse, DeliveryResult, DocumentRequest,
    DocumentResponse, NotificationRequest, QuoteInput, QuoteResult, RouteRequest, RouteResponse,
    SupportRequest, SupportResponse,
};
use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct AgentState {
    runtime: Arc<AgentRuntime>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AgentError {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
    pub correlation_id: String,
}

pub fn router(runtime: Arc<AgentRuntime>) -> Router {
    Router::new()
        .route("/agents/quote", post(generate_quote))
        .route("/agents/route", post(optimize_route))
        .route("/agents/document", post(process_document))
        .route("/agents/support", post(answer_support))
        .route("/agents/delay-prediction", post(predict_delay))
        .route("/agents/notify", post(notify))
        .with_state(AgentState { runtime })
}

async fn generate_quote(
    State(state): State<AgentState>,
    Json(input): Json<QuoteInput>,
) -> Result<Json<QuoteResult>, (StatusCode, Json<AgentError>)> {
    state.runtime.generate_quote(input).await.map(Json).map_err(quote_failure)
}

fn quote_failure(failure: QuoteError) -> (StatusCode, Json<AgentError>) {
    let code = match &failure {
        QuoteError::Validation(validation) => validation.code(),
        QuoteError::Domain(_) => "internal_error",
    };
    let interface = ApplicationError::from(failure).into_interface(Uuid::new_v4().to_string());

    let (status, message) = match &interface {
        InterfaceError::BadRequest { message, .. } => (StatusCode::BAD_REQUEST, message.clone()),
        InterfaceError::Internal { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, interface.user_message().to_string())
        }
    };

    if status.is_server_error() {
        error!(
            event_name = "api.quote.failed",
            correlation_id = interface.correlation_id(),
            error = interface.message(),
            "quote generation failed"
        );
    } else {
        warn!(
            event_name = "api.quote.rejected",
            correlation_id = interface.correlation_id(),
            code,
            "quote request rejected"
        );
    }

    (
        status,
        Json(AgentError {
            success: false,
            error: message,
            code,
            correlation_id: interface.correlation_id().to_string(),
        }),
    )
}

async fn optimize_route(
    State(state): State<AgentState>,
    Json(request): Json<RouteRequest>,
) -> Json<RouteResponse> {
    Json(state.runtime.optimize_route(&request).await)
}

async fn process_document(
    State(state): State<AgentState>,
    Json(request): Json<DocumentRequest>,
) -> Json<DocumentResponse> {
    Json(state.runtime.process_document(&request).await)
}

async fn answer_support(
    State(state): State<AgentState>,
    Json(request): Json<SupportRequest>,
) -> Json<SupportResponse> {
    Json(state.runtime.answer_support(request).await)
}

async fn predict_delay(
    State(state): State<AgentState>,
    Json(request): Json<DelayPredictionRequest>,
) -> Json<DelayPredictionResponse> {
    Json(state.runtime.predict_delay(&request).await)
}

async fn notify(
    State(state): State<AgentState>,
    Json(request): Json<NotificationRequest>,
) -> Json<DeliveryResult> {
    Json(state.runtime.notify(&request).await)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::extract::State;
    use axum::http::{Request, StatusCode};
    use axum::Json;
    use glowie_agent::{AgentRuntime, RuntimeServices};
    use glowie_core::{DocumentType, RiskLevel};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::{answer_support, predict_delay, process_document, router, AgentState};

    fn runtime() -> Arc<AgentRuntime> {
        Arc::new(AgentRuntime::new(RuntimeServices::offline()).expect("runtime"))
    }

    fn state() -> State<AgentState> {
        State(AgentState { runtime: runtime() })
    }

    async fn post(uri: &str, body: Value) -> (StatusCode, Value) {
        let response = router(runtime())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    fn camry(year: i32) -> Value {
        json!({
            "vehicle_type": "Sedan",
            "year": year,
            "make": "Toyota",
            "model": "Camry",
            "origin_country": "Japan",
            "shipping_method": "roro"
        })
    }

    #[tokio::test]
    async fn quote_endpoint_returns_fallback_priced_quote() {
        let (status, body) = post("/agents/quote", camry(2020)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["total_cost"], 3064.0);
        assert_eq!(body["breakdown"]["vat"], 414.0);
        assert_eq!(body["estimated_delivery_days"], 45);
        assert!(body["quote_reference"].as_str().expect("reference").starts_with("QTE-"));
    }

    #[tokio::test]
    async fn quote_endpoint_rejects_invalid_year() {
        let (status, body) = post("/agents/quote", camry(1975)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "invalid_year");
        assert_eq!(body["error"], "Invalid vehicle year");
        assert!(body.get("quote_reference").is_none());
    }

    #[tokio::test]
    async fn route_endpoint_falls_back_to_static_table() {
        let (status, body) = post("/agents/route", json!({ "shipment_id": 3, "origin": "UK" })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["optimization"]["transit_time_days"], 35);
    }

    #[tokio::test]
    async fn route_endpoint_accepts_unrecognised_priority() {
        let (status, body) = post(
            "/agents/route",
            json!({ "shipment_id": 4, "origin": "Japan", "priority": "urgent" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["optimization"]["transit_time_days"], 40);
    }

    #[tokio::test]
    async fn notify_endpoint_reports_pending() {
        let (status, body) =
            post("/agents/notify", json!({ "event_type": "quote.created", "payload": {} })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "pending");
    }

    #[tokio::test]
    async fn support_handler_escalates_without_provider() {
        let Json(response) = answer_support(
            state(),
            Json(serde_json::from_value(json!({
                "query": "I want to speak to a manager",
                "customer_id": 12
            }))
            .expect("request")),
        )
        .await;

        assert!(!response.success);
        assert!(response.requires_human);
        assert_eq!(response.confidence_score, 0.5);
    }

    #[tokio::test]
    async fn delay_handler_returns_low_risk_fallback() {
        let Json(response) = predict_delay(
            state(),
            Json(serde_json::from_value(json!({ "shipment_id": 8 })).expect("request")),
        )
        .await;

        let prediction = response.prediction.expect("prediction");
        assert_eq!(prediction.risk_level, RiskLevel::Low);
        assert_eq!(prediction.confidence_score, 0.5);
    }

    #[tokio::test]
    async fn document_handler_reports_processing_failure() {
        let Json(response) = process_document(
            state(),
            Json(serde_json::from_value(json!({
                "text": "Chassis No: NZE141-123",
                "document_type": "vehicle_registration"
            }))
            .expect("request")),
        )
        .await;

        assert!(!response.success);
        assert_eq!(response.document_type, DocumentType::VehicleRegistration);
        assert_eq!(response.message.as_deref(), Some("Document processing failed"));
    }
}
