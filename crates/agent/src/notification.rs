use async_trait::async_trait;
use glowie_core::{DeliveryResult, DeliveryStatus};
use serde_json::Value;
use tracing::info;

/// Routes shipment events to customers. Delivery channels are not wired up
/// yet, so the only implementation accepts events without sending anything.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, event_type: &str, payload: &Value) -> DeliveryResult;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PendingNotificationDispatcher;

#[async_trait]
impl NotificationDispatcher for PendingNotificationDispatcher {
    async fn dispatch(&self, event_type: &str, _payload: &Value) -> DeliveryResult {
        info!(
            event_name = "agent.notification.pending",
            event_type,
            "notification accepted without delivery"
        );
        DeliveryResult {
            success: true,
            event_type: event_type.to_string(),
            status: DeliveryStatus::Pending,
            message: "Notification agent - Implementation pending".to_string(),
        }
    }
}
