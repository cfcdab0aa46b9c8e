use serde::Serialize;
use tracing::{debug, warn};

use crate::extract::ParseError;
use crate::llm::{CompletionClient, CompletionRequest};
use crate::prompts::PromptError;

/// Where an agent's payload came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeSource {
    Model,
    Heuristic,
    Fallback,
    Cache,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AgentOutcome<P> {
    pub success: bool,
    pub payload: P,
    pub error: Option<String>,
    pub source: OutcomeSource,
}

impl<P> AgentOutcome<P> {
    pub fn succeeded(payload: P, source: OutcomeSource) -> Self {
        Self { success: true, payload, error: None, source }
    }

    pub fn failed(payload: P, error: impl Into<String>) -> Self {
        Self { success: false, payload, error: Some(error.into()), source: OutcomeSource::Fallback }
    }
}

/// One prompt, one completion call, one typed result.
///
/// Implementors supply the prompt, the strict and heuristic extraction phases,
/// and the static payload used when the provider call fails.
pub trait SingleCallAgent: Send + Sync {
    type Input: Sync;
    type Payload: Send;

    fn name(&self) -> &'static str;

    fn request(&self, input: &Self::Input) -> Result<CompletionRequest, PromptError>;

    fn strict(&self, reply: &str) -> Result<Self::Payload, ParseError>;

    fn heuristic(&self, input: &Self::Input, reply: &str) -> Self::Payload;

    fn fallback(&self, input: &Self::Input) -> Self::Payload;
}

/// Runs an agent to completion. Provider, prompt, and parse failures are all
/// absorbed here; the caller always receives a payload.
pub async fn run_single_call<A>(
    agent: &A,
    client: &dyn CompletionClient,
    input: &A::Input,
) -> AgentOutcome<A::Payload>
where
    A: SingleCallAgent + ?Sized,
{
    let request = match agent.request(input) {
        Ok(request) => request,
        Err(error) => {
            warn!(
                event_name = "agent.prompt.failed",
                agent = agent.name(),
                error = %error,
                "prompt could not be rendered, using fallback"
            );
            return AgentOutcome::failed(agent.fallback(input), error.to_string());
        }
    };

    let reply = match client.complete(request).await {
        Ok(reply) => reply,
        Err(error) => {
            warn!(
                event_name = "agent.fallback",
                agent = agent.name(),
                provider = client.name(),
                error = %error,
                "completion failed, using fallback"
            );
            return AgentOutcome::failed(agent.fallback(input), error.to_string());
        }
    };

    match agent.strict(&reply) {
        Ok(payload) => AgentOutcome::succeeded(payload, OutcomeSource::Model),
        Err(error) => {
            debug!(
                event_name = "agent.parse.heuristic",
                agent = agent.name(),
                error = %error,
                "strict parse failed, using heuristic extraction"
            );
            AgentOutcome::succeeded(agent.heuristic(input, &reply), OutcomeSource::Heuristic)
        }
    }
}
