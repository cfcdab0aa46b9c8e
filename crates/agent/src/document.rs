use glowie_core::{ChatRole, ChatTurn, DocumentRequest, DocumentResponse};
use serde_json::{Map, Value};
use tracing::info;

use crate::extract::{key_value_lines, parse_json_object, ParseError};
use crate::llm::{CompletionClient, CompletionRequest};
use crate::prompts::{document_extraction, PromptError};
use crate::single_call::{run_single_call, SingleCallAgent};

const EXTRACTION_TEMPERATURE: f32 = 0.3;
const EXTRACTION_CONFIDENCE: f64 = 0.85;

#[derive(Clone, Copy, Debug, Default)]
pub struct DocumentAgent;

impl DocumentAgent {
    pub async fn extract(
        &self,
        client: &dyn CompletionClient,
        request: &DocumentRequest,
    ) -> DocumentResponse {
        let outcome = run_single_call(self, client, request).await;
        info!(
            event_name = "agent.document.completed",
            document_type = request.document_type.as_str(),
            success = outcome.success,
            fields = outcome.payload.len(),
            "document extraction finished"
        );

        if outcome.success {
            DocumentResponse {
                success: true,
                document_type: request.document_type,
                extracted_data: Some(outcome.payload),
                confidence_score: Some(EXTRACTION_CONFIDENCE),
                error: None,
                message: None,
            }
        } else {
            DocumentResponse {
                success: false,
                document_type: request.document_type,
                extracted_data: None,
                confidence_score: None,
                error: outcome.error,
                message: Some("Document processing failed".to_string()),
            }
        }
    }
}

impl SingleCallAgent for DocumentAgent {
    type Input = DocumentRequest;
    type Payload = Map<String, Value>;

    fn name(&self) -> &'static str {
        "document"
    }

    fn request(&self, input: &DocumentRequest) -> Result<CompletionRequest, PromptError> {
        Ok(CompletionRequest::messages(vec![
            ChatTurn {
                role: ChatRole::System,
                content: document_extraction(input.document_type).to_string(),
            },
            ChatTurn {
                role: ChatRole::User,
                content: format!("Extract information from this document:\n\n{}", input.text),
            },
        ])
        .with_temperature(EXTRACTION_TEMPERATURE))
    }

    fn strict(&self, reply: &str) -> Result<Map<String, Value>, ParseError> {
        parse_json_object(reply)
    }

    fn heuristic(&self, _input: &DocumentRequest, reply: &str) -> Map<String, Value> {
        let fields = key_value_lines(reply);
        if !fields.is_empty() {
            return fields;
        }

        let mut raw = Map::new();
        raw.insert("raw_response".to_string(), Value::String(reply.to_string()));
        raw
    }

    fn fallback(&self, _input: &DocumentRequest) -> Map<String, Value> {
        Map::new()
    }
}

#[cfg(test)]
mod tests {
    use glowie_core::{ChatRole, DocumentRequest, DocumentType};

    use super::DocumentAgent;
    use crate::llm::{Prompt, ProviderError, ScriptedCompletionClient};

    fn request(document_type: DocumentType) -> DocumentRequest {
        DocumentRequest {
            text: "Invoice No. 42\nSeller: Tokyo Motors".to_string(),
            document_type,
        }
    }

    #[tokio::test]
    async fn json_reply_becomes_extracted_data() {
        let client = ScriptedCompletionClient::replying(
            "```json\n{\"invoice_number\": \"42\", \"seller\": \"Tokyo Motors\"}\n```",
        );
        let response = DocumentAgent.extract(&client, &request(DocumentType::Invoice)).await;

        let data = response.extracted_data.expect("data");
        assert!(response.success);
        assert_eq!(response.confidence_score, Some(0.85));
        assert_eq!(data["invoice_number"], "42");

        let sent = &client.requests()[0];
        assert_eq!(sent.temperature, Some(0.3));
        let Prompt::Messages(messages) = &sent.prompt else {
            panic!("document prompts are role-tagged");
        };
        assert_eq!(messages[0].role, ChatRole::System);
        assert!(messages[0].content.starts_with("Extract: Invoice Number"));
        assert!(messages[1].content.starts_with("Extract information from this document:\n\n"));
    }

    #[tokio::test]
    async fn key_value_reply_is_split_into_fields() {
        let client = ScriptedCompletionClient::replying("Vessel Name: Sea Star\nPort of Loading: Yokohama");
        let response = DocumentAgent.extract(&client, &request(DocumentType::BillOfLading)).await;

        let data = response.extracted_data.expect("data");
        assert_eq!(data["vessel_name"], "Sea Star");
        assert_eq!(data["port_of_loading"], "Yokohama");
    }

    #[tokio::test]
    async fn unstructured_reply_is_kept_raw() {
        let client = ScriptedCompletionClient::replying("I could not read this document");
        let response = DocumentAgent.extract(&client, &request(DocumentType::Other)).await;

        let data = response.extracted_data.expect("data");
        assert_eq!(data["raw_response"], "I could not read this document");
    }

    #[tokio::test]
    async fn provider_failure_reports_processing_failure() {
        let client = ScriptedCompletionClient::failing(ProviderError::Network("reset".to_string()));
        let response = DocumentAgent.extract(&client, &request(DocumentType::Invoice)).await;

        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("Document processing failed"));
        assert_eq!(response.error.as_deref(), Some("network error: reset"));
        assert!(response.extracted_data.is_none());
    }
}
