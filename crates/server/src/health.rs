use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use glowie_core::config::AppSettings;
use serde::Serialize;

pub const SERVICE_VERSION: &str = "1.0.0";

#[derive(Clone)]
pub struct HealthState {
    service: String,
    environment: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub version: &'static str,
    pub environment: String,
    pub timestamp: DateTime<Utc>,
}

pub fn router(app: &AppSettings) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState {
        service: app.name.clone(),
        environment: app.environment.clone(),
    })
}

pub async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: state.service,
        version: SERVICE_VERSION,
        environment: state.environment,
        timestamp: Utc::now(),
    })
}
