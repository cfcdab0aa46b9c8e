use std::sync::Arc;

use chrono::Utc;
use glowie_core::{DelayPrediction, DelayPredictionRequest, DelayPredictionResponse, RiskLevel};
use tracing::info;

use crate::extract::{extract_typed, sniff_risk_level, truncate_chars, ParseError};
use crate::llm::{CompletionClient, CompletionRequest};
use crate::prompts::{PromptError, PromptLibrary};
use crate::single_call::{run_single_call, SingleCallAgent};

const HEURISTIC_REASONING_CHARS: usize = 200;

pub struct DelayAgent {
    prompts: Arc<PromptLibrary>,
}

impl DelayAgent {
    pub fn new(prompts: Arc<PromptLibrary>) -> Self {
        Self { prompts }
    }

    pub async fn predict(
        &self,
        client: &dyn CompletionClient,
        request: &DelayPredictionRequest,
    ) -> DelayPredictionResponse {
        let outcome = run_single_call(self, client, request).await;
        info!(
            event_name = "agent.delay.completed",
            shipment_id = request.shipment_id,
            success = outcome.success,
            risk_level = outcome.payload.risk_level.as_str(),
            "delay prediction finished"
        );

        DelayPredictionResponse {
            success: outcome.success,
            shipment_id: request.shipment_id,
            prediction: Some(outcome.payload),
            analyzed_at: Utc::now(),
            error: outcome.error,
        }
    }
}

impl SingleCallAgent for DelayAgent {
    type Input = DelayPredictionRequest;
    type Payload = DelayPrediction;

    fn name(&self) -> &'static str {
        "delay"
    }

    fn request(&self, input: &DelayPredictionRequest) -> Result<CompletionRequest, PromptError> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        Ok(CompletionRequest::text(self.prompts.delay_prediction(input, &today)?))
    }

    fn strict(&self, reply: &str) -> Result<DelayPrediction, ParseError> {
        let mut prediction: DelayPrediction = extract_typed(reply)?;
        if !prediction.confidence_score.is_finite() {
            return Err(ParseError::InvalidNumber {
                field: "confidence_score",
                value: prediction.confidence_score.to_string(),
            });
        }
        prediction.confidence_score = prediction.confidence_score.clamp(0.0, 1.0);
        Ok(prediction)
    }

    fn heuristic(&self, _input: &DelayPredictionRequest, reply: &str) -> DelayPrediction {
        DelayPrediction {
            risk_level: sniff_risk_level(reply),
            estimated_delay_days: 2,
            risk_factors: vec!["Standard shipping variations".to_string()],
            recommended_actions: vec!["Monitor shipment status regularly".to_string()],
            confidence_score: 0.6,
            reasoning: truncate_chars(reply, HEURISTIC_REASONING_CHARS),
        }
    }

    fn fallback(&self, _input: &DelayPredictionRequest) -> DelayPrediction {
        DelayPrediction {
            risk_level: RiskLevel::Low,
            estimated_delay_days: 0,
            risk_factors: vec!["No significant risks detected".to_string()],
            recommended_actions: vec!["Continue monitoring shipment".to_string()],
            confidence_score: 0.5,
            reasoning: "Standard prediction based on typical shipping patterns".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glowie_core::{DelayPredictionRequest, RiskLevel};

    use super::DelayAgent;
    use crate::llm::{ProviderError, ScriptedCompletionClient};
    use crate::prompts::PromptLibrary;

    fn agent() -> DelayAgent {
        DelayAgent::new(Arc::new(PromptLibrary::embedded().expect("templates")))
    }

    fn request() -> DelayPredictionRequest {
        serde_json::from_value(serde_json::json!({ "shipment_id": 5 })).expect("request")
    }

    #[tokio::test]
    async fn json_prediction_fills_missing_keys_with_defaults() {
        let client = ScriptedCompletionClient::replying(
            r#"{"risk_level": "high", "estimated_delay_days": 4, "risk_factors": ["Port congestion at Mombasa"]}"#,
        );
        let response = agent().predict(&client, &request()).await;

        let prediction = response.prediction.expect("prediction");
        assert!(response.success);
        assert_eq!(response.shipment_id, 5);
        assert_eq!(prediction.risk_level, RiskLevel::High);
        assert_eq!(prediction.estimated_delay_days, 4);
        assert!(prediction.recommended_actions.is_empty());
        assert_eq!(prediction.confidence_score, 0.7);
        assert_eq!(prediction.reasoning, "Analysis based on current shipping patterns");
    }

    #[tokio::test]
    async fn prose_reply_is_sniffed_for_risk() {
        let reply = "The risk of delay is low this month. ".repeat(10);
        let client = ScriptedCompletionClient::replying(reply.clone());
        let response = agent().predict(&client, &request()).await;

        let prediction = response.prediction.expect("prediction");
        assert!(response.success);
        assert_eq!(prediction.risk_level, RiskLevel::Low);
        assert_eq!(prediction.estimated_delay_days, 2);
        assert_eq!(prediction.confidence_score, 0.6);
        assert_eq!(prediction.reasoning.chars().count(), 200);
        assert!(reply.starts_with(&prediction.reasoning));
    }

    #[tokio::test]
    async fn provider_failure_yields_low_risk_fallback() {
        let client =
            ScriptedCompletionClient::failing(ProviderError::Authentication("bad key".to_string()));
        let response = agent().predict(&client, &request()).await;

        let prediction = response.prediction.expect("prediction");
        assert!(!response.success);
        assert_eq!(prediction.risk_level, RiskLevel::Low);
        assert_eq!(prediction.estimated_delay_days, 0);
        assert_eq!(prediction.confidence_score, 0.5);
        assert_eq!(prediction.risk_factors, vec!["No significant risks detected".to_string()]);
    }

    #[tokio::test]
    async fn prompt_carries_current_date() {
        let client = ScriptedCompletionClient::failing(ProviderError::RateLimited);
        agent().predict(&client, &request()).await;

        let requests = client.requests();
        let prompt = match &requests[0].prompt {
            crate::llm::Prompt::Text(text) => text.clone(),
            crate::llm::Prompt::Messages(_) => String::new(),
        };
        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        assert!(prompt.contains(&format!("- Current Date: {today}")));
        assert!(prompt.contains("- Current Status: in_transit"));
    }
}
