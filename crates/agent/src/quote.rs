//! The five-stage quote pipeline.
//!
//! Stages run in a fixed order over one [`QuoteState`] owned by the run. Each
//! stage returns a [`StageUpdate`] that is merged into the state; a validation
//! failure is terminal and no later stage runs.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{Datelike, Utc};
use glowie_core::errors::{ApplicationError, DomainError, ValidationError};
use glowie_core::pricing::{apply_adjustment, PricingEngine};
use glowie_core::reference::generate_quote_reference;
use glowie_core::{QuoteInput, QuoteResult, QuoteState, QuoteStatus, StageUpdate};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, warn};

use crate::extract::{labeled_value, ParseError};
use crate::guardrails::{AdjustmentProposal, GuardrailDecision, PricingGuardrail};
use crate::llm::{CompletionClient, CompletionRequest};
use crate::prompts::PromptLibrary;
use crate::record_store::{RecordStore, Resource};

pub const MIN_VEHICLE_YEAR: i32 = 1990;
pub const FALLBACK_REASONING: &str = "Standard pricing applied (AI unavailable)";
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QuoteError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Domain(DomainError),
}

impl From<DomainError> for QuoteError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Validation(validation) => Self::Validation(validation),
            other => Self::Domain(other),
        }
    }
}

impl From<QuoteError> for ApplicationError {
    fn from(error: QuoteError) -> Self {
        match error {
            QuoteError::Validation(validation) => Self::Domain(validation.into()),
            QuoteError::Domain(domain) => Self::Domain(domain),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Validate,
    ComputeBaseCost,
    ApplyMarketAdjustment,
    ComputeBreakdown,
    Finalize,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::ComputeBaseCost => "compute_base_cost",
            Self::ApplyMarketAdjustment => "apply_market_adjustment",
            Self::ComputeBreakdown => "compute_breakdown",
            Self::Finalize => "finalize",
        }
    }
}

pub const STAGES: [Stage; 5] = [
    Stage::Validate,
    Stage::ComputeBaseCost,
    Stage::ApplyMarketAdjustment,
    Stage::ComputeBreakdown,
    Stage::Finalize,
];

/// Parsed `ADJUSTMENT:` / `REASONING:` / `CONFIDENCE:` reply.
#[derive(Clone, Debug, PartialEq)]
pub struct MarketAdjustment {
    pub percent: Decimal,
    pub reasoning: String,
    pub confidence: f64,
}

/// All three labeled lines must be present and numeric where expected.
pub fn parse_market_adjustment(reply: &str) -> Result<MarketAdjustment, ParseError> {
    let raw_percent =
        labeled_value(reply, "ADJUSTMENT").ok_or(ParseError::MissingField("ADJUSTMENT"))?;
    let reasoning = labeled_value(reply, "REASONING")
        .filter(|value| !value.is_empty())
        .ok_or(ParseError::MissingField("REASONING"))?;
    let raw_confidence =
        labeled_value(reply, "CONFIDENCE").ok_or(ParseError::MissingField("CONFIDENCE"))?;

    let cleaned = raw_percent.trim_end_matches('%').trim().trim_start_matches('+');
    let percent = Decimal::from_str(cleaned).map_err(|_| ParseError::InvalidNumber {
        field: "ADJUSTMENT",
        value: raw_percent.to_string(),
    })?;

    let confidence = raw_confidence
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ParseError::InvalidNumber {
            field: "CONFIDENCE",
            value: raw_confidence.to_string(),
        })?;

    Ok(MarketAdjustment { percent, reasoning: reasoning.to_string(), confidence })
}

pub fn validate_input(input: &QuoteInput, current_year: i32) -> Result<(), ValidationError> {
    if input.year < MIN_VEHICLE_YEAR || input.year > current_year + 1 {
        return Err(ValidationError::InvalidYear);
    }
    if input.make.trim().is_empty() || input.model.trim().is_empty() {
        return Err(ValidationError::MissingVehicleDetails);
    }
    Ok(())
}

fn format_money(amount: Decimal) -> String {
    format!("${amount:.2}")
}

fn fallback_update(base_cost: Decimal) -> StageUpdate {
    StageUpdate {
        adjusted_cost: Some(base_cost),
        ai_reasoning: Some(FALLBACK_REASONING.to_string()),
        confidence_score: Some(FALLBACK_CONFIDENCE),
        ..StageUpdate::with_message("Using base cost (AI adjustment failed)")
    }
}

pub struct QuotePipeline {
    pricing: Arc<dyn PricingEngine>,
    prompts: Arc<PromptLibrary>,
    guardrail: PricingGuardrail,
}

impl QuotePipeline {
    pub fn new(
        pricing: Arc<dyn PricingEngine>,
        prompts: Arc<PromptLibrary>,
        guardrail: PricingGuardrail,
    ) -> Self {
        Self { pricing, prompts, guardrail }
    }

    pub async fn run(
        &self,
        input: QuoteInput,
        client: &dyn CompletionClient,
        store: &dyn RecordStore,
    ) -> Result<QuoteResult, QuoteError> {
        info!(
            event_name = "agent.quote.started",
            make = %input.make,
            model = %input.model,
            origin = %input.origin_country,
            "generating quote"
        );

        let mut state = QuoteState::new(input);
        for stage in STAGES {
            let update = match stage {
                Stage::Validate => match self.validate(&state) {
                    Ok(update) => update,
                    Err((update, error)) => {
                        state.apply(update)?;
                        warn!(
                            event_name = "agent.quote.validation_failed",
                            code = error.code(),
                            "quote input rejected"
                        );
                        return Err(QuoteError::Validation(error));
                    }
                },
                Stage::ComputeBaseCost => self.compute_base_cost(&state),
                Stage::ApplyMarketAdjustment => self.apply_market_adjustment(&state, client).await,
                Stage::ComputeBreakdown => self.compute_breakdown(&state),
                Stage::Finalize => self.finalize(&state, store).await,
            };
            state.apply(update)?;
        }

        let result = QuoteResult::from_state(state, Utc::now())?;
        info!(
            event_name = "agent.quote.completed",
            quote_reference = %result.quote_reference,
            total_cost = %result.total_cost,
            confidence = result.confidence_score,
            "quote generated"
        );
        Ok(result)
    }

    fn validate(&self, state: &QuoteState) -> Result<StageUpdate, (StageUpdate, ValidationError)> {
        match validate_input(&state.input, Utc::now().year()) {
            Ok(()) => Ok(StageUpdate {
                status: Some(QuoteStatus::Validated),
                ..StageUpdate::with_message("Input validation successful")
            }),
            Err(error) => Err((
                StageUpdate {
                    status: Some(QuoteStatus::Error),
                    error: Some(error.to_string()),
                    ..StageUpdate::with_message(error.trace_message())
                },
                error,
            )),
        }
    }

    fn compute_base_cost(&self, state: &QuoteState) -> StageUpdate {
        let base_cost = self.pricing.base_cost(&state.input);
        StageUpdate {
            base_cost: Some(base_cost),
            ..StageUpdate::with_message(format!("Base cost calculated: {}", format_money(base_cost)))
        }
    }

    async fn apply_market_adjustment(
        &self,
        state: &QuoteState,
        client: &dyn CompletionClient,
    ) -> StageUpdate {
        let base_cost = state.base_cost;
        let month = Utc::now().format("%B").to_string();
        let prompt = match self.prompts.quote_adjustment(
            &state.input,
            base_cost,
            &month,
            self.guardrail.bounds(),
        ) {
            Ok(prompt) => prompt,
            Err(error) => return self.fall_back(base_cost, &error.to_string()),
        };

        let reply = match client.complete(CompletionRequest::text(prompt)).await {
            Ok(reply) => reply,
            Err(error) => return self.fall_back(base_cost, &error.to_string()),
        };

        let parsed = match parse_market_adjustment(&reply) {
            Ok(parsed) => parsed,
            Err(error) => return self.fall_back(base_cost, &error.to_string()),
        };

        let mut messages = Vec::new();
        let proposal = AdjustmentProposal { percent: parsed.percent, confidence: parsed.confidence };
        let accepted = match self.guardrail.evaluate(proposal) {
            GuardrailDecision::Allow => proposal,
            GuardrailDecision::Clamp { reason_code, adjusted, note } => {
                info!(event_name = "agent.quote.ai_clamped", reason_code, "AI proposal clamped");
                messages.push(note);
                adjusted
            }
            GuardrailDecision::Deny { note, .. } => return self.fall_back(base_cost, &note),
        };

        let adjusted_cost = apply_adjustment(base_cost, accepted.percent);
        let sign = if accepted.percent.is_sign_negative() { "" } else { "+" };
        messages.push(format!(
            "AI adjusted cost: {} ({sign}{:.1}%)",
            format_money(adjusted_cost),
            accepted.percent
        ));

        StageUpdate {
            adjusted_cost: Some(adjusted_cost),
            ai_reasoning: Some(parsed.reasoning),
            confidence_score: Some(accepted.confidence),
            messages,
            ..StageUpdate::default()
        }
    }

    fn fall_back(&self, base_cost: Decimal, reason: &str) -> StageUpdate {
        warn!(
            event_name = "agent.quote.ai_fallback",
            reason,
            "market adjustment unavailable, using base cost"
        );
        fallback_update(base_cost)
    }

    fn compute_breakdown(&self, state: &QuoteState) -> StageUpdate {
        let breakdown = self.pricing.breakdown(state.adjusted_cost);
        StageUpdate {
            breakdown: Some(breakdown),
            estimated_delivery_days: Some(self.pricing.delivery_days(&state.input.origin_country)),
            ..StageUpdate::with_message(format!("Total cost: {}", format_money(breakdown.total)))
        }
    }

    async fn finalize(&self, state: &QuoteState, store: &dyn RecordStore) -> StageUpdate {
        let reference = generate_quote_reference();
        let record = state.persistence_record(&reference).map(|record| serde_json::to_value(&record));
        let saved = match record {
            Some(Ok(record)) => store.create(Resource::Quotes, record).await.is_some(),
            Some(Err(error)) => {
                warn!(
                    event_name = "agent.quote.persist_failed",
                    error = %error,
                    "quote record not serializable"
                );
                false
            }
            None => false,
        };

        let message = if saved {
            format!("Quote saved with reference: {reference}")
        } else {
            warn!(
                event_name = "agent.quote.persist_failed",
                quote_reference = %reference,
                "quote record was not stored by the backend"
            );
            format!("Quote generated with reference: {reference} (not persisted)")
        };

        StageUpdate {
            status: Some(QuoteStatus::Completed),
            quote_reference: Some(reference),
            ..StageUpdate::with_message(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Datelike, Utc};
    use glowie_core::errors::ValidationError;
    use glowie_core::pricing::DeterministicPricingEngine;
    use glowie_core::reference::is_quote_reference;
    use glowie_core::{QuoteInput, ShippingMethod, VehicleType};
    use rust_decimal::Decimal;

    use super::{parse_market_adjustment, validate_input, QuoteError, QuotePipeline};
    use crate::extract::ParseError;
    use crate::guardrails::PricingGuardrail;
    use crate::llm::{OfflineCompletionClient, ScriptedCompletionClient};
    use crate::prompts::PromptLibrary;
    use crate::record_store::{InMemoryRecordStore, Resource};

    fn pipeline() -> QuotePipeline {
        QuotePipeline::new(
            Arc::new(DeterministicPricingEngine::default()),
            Arc::new(PromptLibrary::embedded().expect("templates")),
            PricingGuardrail::default(),
        )
    }

    fn camry() -> QuoteInput {
        QuoteInput::new(VehicleType::Sedan, 2020, "Toyota", "Camry", "Japan", ShippingMethod::Roro)
    }

    #[test]
    fn adjustment_reply_parses_with_signs_and_percent() {
        let parsed = parse_market_adjustment(
            "Analysis:\nADJUSTMENT: +12.5%\nREASONING: Peak season demand.\nCONFIDENCE: 0.75",
        )
        .expect("parsed");
        assert_eq!(parsed.percent, Decimal::new(125, 1));
        assert_eq!(parsed.reasoning, "Peak season demand.");
        assert_eq!(parsed.confidence, 0.75);

        let negative =
            parse_market_adjustment("ADJUSTMENT: -5\nREASONING: Quiet month\nCONFIDENCE: 0.6")
                .expect("parsed");
        assert_eq!(negative.percent, Decimal::from(-5));
    }

    #[test]
    fn adjustment_reply_requires_every_line() {
        assert_eq!(
            parse_market_adjustment("ADJUSTMENT: 5\nCONFIDENCE: 0.6"),
            Err(ParseError::MissingField("REASONING"))
        );
        assert!(matches!(
            parse_market_adjustment("ADJUSTMENT: ten\nREASONING: x\nCONFIDENCE: 0.6"),
            Err(ParseError::InvalidNumber { field: "ADJUSTMENT", .. })
        ));
        assert!(matches!(
            parse_market_adjustment("ADJUSTMENT: 5\nREASONING: x\nCONFIDENCE: NaN"),
            Err(ParseError::InvalidNumber { field: "CONFIDENCE", .. })
        ));
    }

    #[test]
    fn year_bounds_follow_the_calendar() {
        let current_year = Utc::now().year();
        let mut input = camry();

        input.year = current_year + 1;
        assert_eq!(validate_input(&input, current_year), Ok(()));
        input.year = 1990;
        assert_eq!(validate_input(&input, current_year), Ok(()));
        input.year = 1989;
        assert_eq!(validate_input(&input, current_year), Err(ValidationError::InvalidYear));
        input.year = current_year + 2;
        assert_eq!(validate_input(&input, current_year), Err(ValidationError::InvalidYear));
    }

    #[tokio::test]
    async fn sedan_from_japan_without_ai() {
        let store = InMemoryRecordStore::new();
        let result = pipeline().run(camry(), &OfflineCompletionClient, &store).await.expect("quote");

        assert!(result.success);
        assert_eq!(result.base_cost, Decimal::from(1500));
        assert_eq!(result.adjusted_cost, Decimal::from(1500));
        assert_eq!(result.breakdown.vat, Decimal::from(414));
        assert_eq!(result.total_cost, Decimal::from(3064));
        assert_eq!(result.estimated_delivery_days, 45);
        assert_eq!(result.confidence_score, 0.5);
        assert_eq!(result.ai_reasoning, "Standard pricing applied (AI unavailable)");
        assert!(is_quote_reference(&result.quote_reference));

        let saved = store.records(Resource::Quotes);
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0]["reference"], result.quote_reference.as_str());
        assert_eq!(saved[0]["status"], "pending");
    }

    #[tokio::test]
    async fn suv_from_uae_by_container_without_ai() {
        let input = QuoteInput::new(
            VehicleType::Suv,
            2019,
            "Ford",
            "Explorer",
            "UAE",
            ShippingMethod::Container,
        );
        let result = pipeline()
            .run(input, &OfflineCompletionClient, &InMemoryRecordStore::new())
            .await
            .expect("quote");

        assert_eq!(result.base_cost, Decimal::from(1920));
        assert_eq!(result.adjusted_cost, Decimal::from(1920));
        assert_eq!(result.total_cost, Decimal::new(35596, 1));
        assert_eq!(result.estimated_delivery_days, 30);
    }

    #[tokio::test]
    async fn ai_adjustment_is_applied() {
        let client = ScriptedCompletionClient::replying(
            "ADJUSTMENT: 10%\nREASONING: Strong demand for sedans.\nCONFIDENCE: 0.9",
        );
        let result =
            pipeline().run(camry(), &client, &InMemoryRecordStore::new()).await.expect("quote");

        assert_eq!(result.adjusted_cost, Decimal::from(1650));
        assert_eq!(result.breakdown.vat, Decimal::from(441));
        assert_eq!(result.total_cost, Decimal::from(3241));
        assert_eq!(result.ai_reasoning, "Strong demand for sedans.");
        assert_eq!(result.confidence_score, 0.9);
        assert!(result.messages.iter().any(|message| message == "AI adjusted cost: $1650.00 (+10.0%)"));
    }

    #[tokio::test]
    async fn out_of_range_adjustment_is_clamped() {
        let client = ScriptedCompletionClient::replying(
            "ADJUSTMENT: 80%\nREASONING: Extreme shortage.\nCONFIDENCE: 1.3",
        );
        let result =
            pipeline().run(camry(), &client, &InMemoryRecordStore::new()).await.expect("quote");

        assert_eq!(result.adjusted_cost, Decimal::from(1950));
        assert_eq!(result.confidence_score, 1.0);
    }

    #[tokio::test]
    async fn strict_guardrail_rejects_out_of_range_adjustment() {
        let strict = QuotePipeline::new(
            Arc::new(DeterministicPricingEngine::default()),
            Arc::new(PromptLibrary::embedded().expect("templates")),
            PricingGuardrail { clamp_out_of_range: false, ..PricingGuardrail::default() },
        );
        let client = ScriptedCompletionClient::replying(
            "ADJUSTMENT: 80%\nREASONING: Extreme shortage.\nCONFIDENCE: 0.9",
        );
        let result = strict.run(camry(), &client, &InMemoryRecordStore::new()).await.expect("quote");

        assert_eq!(client.requests().len(), 1);
        assert_eq!(result.adjusted_cost, result.base_cost);
        assert_eq!(result.total_cost, Decimal::from(3064));
        assert_eq!(result.confidence_score, 0.5);
        assert_eq!(result.ai_reasoning, "Standard pricing applied (AI unavailable)");
        assert!(result.messages.iter().any(|message| message == "Using base cost (AI adjustment failed)"));
    }

    #[tokio::test]
    async fn unparseable_reply_falls_back_to_base_cost() {
        let client = ScriptedCompletionClient::replying("Prices look about normal to me.");
        let result =
            pipeline().run(camry(), &client, &InMemoryRecordStore::new()).await.expect("quote");

        assert_eq!(result.adjusted_cost, result.base_cost);
        assert_eq!(result.confidence_score, 0.5);
        assert_eq!(result.total_cost, Decimal::from(3064));
        assert!(result.messages.iter().any(|message| message == "Using base cost (AI adjustment failed)"));
    }

    #[tokio::test]
    async fn invalid_year_short_circuits_before_any_provider_call() {
        let client = ScriptedCompletionClient::replying("ADJUSTMENT: 5\nREASONING: x\nCONFIDENCE: 1");
        let store = InMemoryRecordStore::new();
        let mut input = camry();
        input.year = 1985;

        let error = pipeline().run(input, &client, &store).await.expect_err("invalid year");

        assert_eq!(error, QuoteError::Validation(ValidationError::InvalidYear));
        assert!(client.requests().is_empty());
        assert!(store.records(Resource::Quotes).is_empty());
    }

    #[tokio::test]
    async fn blank_model_is_rejected() {
        let mut input = camry();
        input.model = "   ".to_string();

        let error = pipeline()
            .run(input, &OfflineCompletionClient, &InMemoryRecordStore::new())
            .await
            .expect_err("missing model");

        assert_eq!(error, QuoteError::Validation(ValidationError::MissingVehicleDetails));
    }

    #[tokio::test]
    async fn persistence_failure_does_not_fail_the_quote() {
        let store = InMemoryRecordStore::rejecting_writes();
        let result = pipeline().run(camry(), &OfflineCompletionClient, &store).await.expect("quote");

        assert!(result.success);
        assert!(result.messages.iter().any(|message| message.ends_with("(not persisted)")));
    }
}
