use std::sync::Arc;
use std::time::Instant;

use glowie_core::{ChatRole, ChatTurn, SupportRequest, SupportResponse};
use serde_json::Value;
use tracing::info;

use crate::extract::ParseError;
use crate::llm::{CompletionClient, CompletionRequest};
use crate::prompts::{PromptError, PromptLibrary};
use crate::record_store::{RecordStore, Resource};
use crate::single_call::{run_single_call, SingleCallAgent};

const ESCALATION_KEYWORDS: [&str; 10] = [
    "complaint",
    "problem",
    "issue",
    "urgent",
    "emergency",
    "speak to",
    "talk to",
    "human",
    "manager",
    "refund",
];

const MODEL_CONFIDENCE: f64 = 0.85;
const FALLBACK_CONFIDENCE: f64 = 0.5;

pub fn requires_human(query: &str) -> bool {
    let lowered = query.to_lowercase();
    ESCALATION_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}

pub fn suggested_questions(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    let suggestions: [&str; 3] = if lowered.contains("cost") || lowered.contains("price") {
        ["How long does shipping take?", "What documents do I need?", "Can I get a quote?"]
    } else if lowered.contains("time") || lowered.contains("long") {
        [
            "How much does shipping cost?",
            "Can I track my shipment?",
            "What's included in the service?",
        ]
    } else if lowered.contains("track") {
        [
            "How do I get a tracking number?",
            "What if my shipment is delayed?",
            "Can I change delivery location?",
        ]
    } else {
        [
            "How much does shipping cost?",
            "How long does shipping take?",
            "What documents do I need?",
        ]
    };
    suggestions.iter().map(|suggestion| suggestion.to_string()).collect()
}

pub fn fallback_answer(query: &str) -> &'static str {
    let lowered = query.to_lowercase();
    if lowered.contains("cost") || lowered.contains("price") {
        "Shipping costs vary based on vehicle type and origin. Typical range is $2,500-$4,500. Get an instant quote on our website!"
    } else if lowered.contains("time") || lowered.contains("long") {
        "Shipping takes 25-50 days: Japan (40-45 days), UK (30-35 days), UAE (25-30 days). This includes customs clearance."
    } else if lowered.contains("track") {
        "You can track your shipment in real-time using your tracking number on our Track Shipment page."
    } else if lowered.contains("document") {
        "You'll need: Vehicle registration, Bill of sale, Valid ID, Import permit. We'll guide you through the process!"
    } else {
        "Thank you for contacting ShipWithGlowie! For detailed assistance, please visit our FAQ page or request a quote. You can also reach us at support@shipwithglowie.com or +256 700 000 000."
    }
}

/// A support query plus the shipment record it refers to, when one was found.
pub struct SupportContext {
    pub request: SupportRequest,
    pub shipment: Option<Value>,
}

pub struct SupportAgent {
    prompts: Arc<PromptLibrary>,
}

impl SupportAgent {
    pub fn new(prompts: Arc<PromptLibrary>) -> Self {
        Self { prompts }
    }

    pub async fn respond(
        &self,
        client: &dyn CompletionClient,
        store: &dyn RecordStore,
        request: SupportRequest,
    ) -> SupportResponse {
        let started = Instant::now();
        let shipment = match request.shipment_id {
            Some(id) => store.get(Resource::Shipments, &id.to_string()).await,
            None => None,
        };
        let related_shipments = match (request.shipment_id, &shipment) {
            (Some(id), Some(_)) => vec![id],
            _ => Vec::new(),
        };

        let context = SupportContext { request, shipment };
        let outcome = run_single_call(self, client, &context).await;
        let query = &context.request.query;
        let requires_human = requires_human(query);

        info!(
            event_name = "agent.support.completed",
            customer_id = context.request.customer_id,
            success = outcome.success,
            requires_human,
            "support query answered"
        );

        SupportResponse {
            success: outcome.success,
            response: outcome.payload,
            confidence_score: if outcome.success { MODEL_CONFIDENCE } else { FALLBACK_CONFIDENCE },
            requires_human,
            suggested_actions: suggested_questions(query),
            related_shipments,
            response_time_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl SingleCallAgent for SupportAgent {
    type Input = SupportContext;
    type Payload = String;

    fn name(&self) -> &'static str {
        "support"
    }

    fn request(&self, input: &SupportContext) -> Result<CompletionRequest, PromptError> {
        let system = self.prompts.support_system(input.request.shipment_id, input.shipment.as_ref())?;
        let mut messages = Vec::with_capacity(input.request.conversation_history.len() + 2);
        messages.push(ChatTurn { role: ChatRole::System, content: system });
        messages.extend(input.request.conversation_history.iter().cloned());
        messages.push(ChatTurn { role: ChatRole::User, content: input.request.query.clone() });
        Ok(CompletionRequest::messages(messages))
    }

    /// Support replies are free text; an empty reply is the only parse failure.
    fn strict(&self, reply: &str) -> Result<String, ParseError> {
        let trimmed = reply.trim();
        if trimmed.is_empty() {
            return Err(ParseError::MissingField("response"));
        }
        Ok(trimmed.to_string())
    }

    fn heuristic(&self, input: &SupportContext, _reply: &str) -> String {
        fallback_answer(&input.request.query).to_string()
    }

    fn fallback(&self, input: &SupportContext) -> String {
        fallback_answer(&input.request.query).to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glowie_core::{ChatRole, ChatTurn, SupportRequest};
    use serde_json::json;

    use super::{fallback_answer, requires_human, suggested_questions, SupportAgent};
    use crate::llm::{Prompt, ProviderError, ScriptedCompletionClient};
    use crate::prompts::PromptLibrary;
    use crate::record_store::{InMemoryRecordStore, Resource};

    fn agent() -> SupportAgent {
        SupportAgent::new(Arc::new(PromptLibrary::embedded().expect("templates")))
    }

    fn request(query: &str) -> SupportRequest {
        SupportRequest {
            query: query.to_string(),
            customer_id: 21,
            shipment_id: None,
            conversation_history: Vec::new(),
        }
    }

    #[test]
    fn refund_always_escalates() {
        assert!(requires_human("How much is shipping? Also I want a REFUND"));
        assert!(requires_human("Can I talk to someone"));
        assert!(!requires_human("What documents do I need?"));
    }

    #[test]
    fn suggestions_follow_keyword_table() {
        assert_eq!(suggested_questions("What is the price?")[2], "Can I get a quote?");
        assert_eq!(suggested_questions("How long will it take")[1], "Can I track my shipment?");
        assert_eq!(suggested_questions("track my car")[0], "How do I get a tracking number?");
        assert_eq!(
            suggested_questions("hello there"),
            vec![
                "How much does shipping cost?".to_string(),
                "How long does shipping take?".to_string(),
                "What documents do I need?".to_string(),
            ]
        );
    }

    #[test]
    fn fallback_answers_follow_keyword_table() {
        assert!(fallback_answer("which documents").starts_with("You'll need"));
        assert!(fallback_answer("hi").starts_with("Thank you for contacting ShipWithGlowie!"));
    }

    #[tokio::test]
    async fn model_answer_is_returned_with_history_in_order() {
        let client = ScriptedCompletionClient::replying("Shipping from Japan takes about 45 days.");
        let store = InMemoryRecordStore::new();
        let mut request = request("How long from Japan?");
        request.conversation_history =
            vec![ChatTurn { role: ChatRole::User, content: "Hi".to_string() }];

        let response = agent().respond(&client, &store, request).await;

        assert!(response.success);
        assert_eq!(response.response, "Shipping from Japan takes about 45 days.");
        assert_eq!(response.confidence_score, 0.85);
        assert!(!response.requires_human);
        assert!(response.related_shipments.is_empty());

        let Prompt::Messages(messages) = &client.requests()[0].prompt else {
            panic!("support prompts are role-tagged");
        };
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[1].content, "Hi");
        assert_eq!(messages[2].content, "How long from Japan?");
    }

    #[tokio::test]
    async fn shipment_record_is_used_as_context() {
        let client = ScriptedCompletionClient::replying("Your car is at sea.");
        let store = InMemoryRecordStore::new();
        store.seed(Resource::Shipments, "77", json!({ "status": "at_sea" }));
        let mut request = request("Where is my car?");
        request.shipment_id = Some(77);

        let response = agent().respond(&client, &store, request).await;

        assert_eq!(response.related_shipments, vec![77]);
        let Prompt::Messages(messages) = &client.requests()[0].prompt else {
            panic!("support prompts are role-tagged");
        };
        assert!(messages[0].content.contains("at_sea"));
    }

    #[tokio::test]
    async fn provider_failure_still_escalates_and_suggests() {
        let client = ScriptedCompletionClient::failing(ProviderError::Timeout { secs: 30 });
        let store = InMemoryRecordStore::new();

        let response = agent().respond(&client, &store, request("I need a refund on the price")).await;

        assert!(!response.success);
        assert_eq!(response.confidence_score, 0.5);
        assert!(response.requires_human);
        assert!(response.response.starts_with("Shipping costs vary"));
        assert_eq!(response.suggested_actions[0], "How long does shipping take?");
    }
}
