use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportRequest {
    pub query: String,
    pub customer_id: i64,
    #[serde(default)]
    pub shipment_id: Option<i64>,
    #[serde(default)]
    pub conversation_history: Vec<ChatTurn>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupportResponse {
    pub success: bool,
    pub response: String,
    pub confidence_score: f64,
    pub requires_human: bool,
    pub suggested_actions: Vec<String>,
    pub related_shipments: Vec<i64>,
    pub response_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::{ChatRole, SupportRequest};

    #[test]
    fn history_defaults_to_empty_and_roles_parse() {
        let request: SupportRequest = serde_json::from_value(serde_json::json!({
            "query": "Where is my car?",
            "customer_id": 7,
            "conversation_history": [
                { "role": "user", "content": "hi" },
                { "role": "assistant", "content": "hello" }
            ]
        }))
        .expect("request");

        assert_eq!(request.shipment_id, None);
        assert_eq!(request.conversation_history[1].role, ChatRole::Assistant);
    }
}
