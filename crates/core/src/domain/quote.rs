use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    Sedan,
    Suv,
    Truck,
    Van,
    Luxury,
    Motorcycle,
}

impl VehicleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sedan => "sedan",
            Self::Suv => "suv",
            Self::Truck => "truck",
            Self::Van => "van",
            Self::Luxury => "luxury",
            Self::Motorcycle => "motorcycle",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sedan" => Ok(Self::Sedan),
            "suv" => Ok(Self::Suv),
            "truck" => Ok(Self::Truck),
            "van" => Ok(Self::Van),
            "luxury" => Ok(Self::Luxury),
            "motorcycle" => Ok(Self::Motorcycle),
            other => Err(format!(
                "unsupported vehicle type `{other}` (expected sedan|suv|truck|van|luxury|motorcycle)"
            )),
        }
    }
}

impl<'de> Deserialize<'de> for VehicleType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingMethod {
    Roro,
    Container,
}

impl ShippingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Roro => "roro",
            Self::Container => "container",
        }
    }
}

impl fmt::Display for ShippingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShippingMethod {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "roro" => Ok(Self::Roro),
            "container" => Ok(Self::Container),
            other => Err(format!("unsupported shipping method `{other}` (expected roro|container)")),
        }
    }
}

impl<'de> Deserialize<'de> for ShippingMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

fn default_destination_country() -> String {
    "Uganda".to_string()
}

fn default_destination_port() -> Option<String> {
    Some("Port Bell".to_string())
}

/// Caller-supplied quote request. Immutable once accepted by the pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteInput {
    pub vehicle_type: VehicleType,
    pub year: i32,
    pub make: String,
    pub model: String,
    #[serde(default)]
    pub engine_size: Option<u32>,
    pub origin_country: String,
    #[serde(default)]
    pub origin_port: Option<String>,
    #[serde(default = "default_destination_country")]
    pub destination_country: String,
    #[serde(default = "default_destination_port")]
    pub destination_port: Option<String>,
    pub shipping_method: ShippingMethod,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
}

impl QuoteInput {
    /// Minimal input with destination defaults applied.
    pub fn new(
        vehicle_type: VehicleType,
        year: i32,
        make: impl Into<String>,
        model: impl Into<String>,
        origin_country: impl Into<String>,
        shipping_method: ShippingMethod,
    ) -> Self {
        Self {
            vehicle_type,
            year,
            make: make.into(),
            model: model.into(),
            engine_size: None,
            origin_country: origin_country.into(),
            origin_port: None,
            destination_country: default_destination_country(),
            destination_port: default_destination_port(),
            shipping_method,
            customer_email: None,
            customer_name: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Initialized,
    Validated,
    Error,
    Completed,
}

/// Named decomposition of the landed cost. Built only through [`CostBreakdown::compose`],
/// so `total` always equals the sum of the four components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub customs_duty: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub vat: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub levies: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

impl CostBreakdown {
    pub fn compose(shipping: Decimal, customs_duty: Decimal, vat: Decimal, levies: Decimal) -> Self {
        Self { shipping, customs_duty, vat, levies, total: shipping + customs_duty + vat + levies }
    }
}

/// Partial state produced by one pipeline stage and merged into [`QuoteState`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StageUpdate {
    pub status: Option<QuoteStatus>,
    pub base_cost: Option<Decimal>,
    pub adjusted_cost: Option<Decimal>,
    pub ai_reasoning: Option<String>,
    pub confidence_score: Option<f64>,
    pub breakdown: Option<CostBreakdown>,
    pub estimated_delivery_days: Option<u32>,
    pub quote_reference: Option<String>,
    pub error: Option<String>,
    pub messages: Vec<String>,
}

impl StageUpdate {
    pub fn with_message(message: impl Into<String>) -> Self {
        Self { messages: vec![message.into()], ..Self::default() }
    }
}

/// Accumulator owned by a single pipeline run.
#[derive(Clone, Debug, PartialEq)]
pub struct QuoteState {
    pub input: QuoteInput,
    pub status: QuoteStatus,
    pub base_cost: Decimal,
    pub adjusted_cost: Decimal,
    pub total_cost: Decimal,
    pub breakdown: Option<CostBreakdown>,
    pub ai_reasoning: String,
    pub confidence_score: f64,
    pub estimated_delivery_days: u32,
    pub quote_reference: Option<String>,
    pub error: Option<String>,
    pub messages: Vec<String>,
}

impl QuoteState {
    pub fn new(input: QuoteInput) -> Self {
        Self {
            input,
            status: QuoteStatus::Initialized,
            base_cost: Decimal::ZERO,
            adjusted_cost: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            breakdown: None,
            ai_reasoning: String::new(),
            confidence_score: 0.0,
            estimated_delivery_days: 0,
            quote_reference: None,
            error: None,
            messages: Vec::new(),
        }
    }

    pub fn can_transition_to(&self, next: QuoteStatus) -> bool {
        matches!(
            (self.status, next),
            (QuoteStatus::Initialized, QuoteStatus::Validated)
                | (QuoteStatus::Initialized, QuoteStatus::Error)
                | (QuoteStatus::Validated, QuoteStatus::Completed)
        )
    }

    pub fn transition_to(&mut self, next: QuoteStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidQuoteTransition { from: self.status, to: next })
    }

    /// Merges a stage delta. Messages are only ever appended.
    pub fn apply(&mut self, update: StageUpdate) -> Result<(), DomainError> {
        self.messages.extend(update.messages);

        if let Some(status) = update.status {
            self.transition_to(status)?;
        }
        if let Some(error) = update.error {
            self.error = Some(error);
        }
        if let Some(base_cost) = update.base_cost {
            self.base_cost = base_cost.max(Decimal::ZERO);
        }
        if let Some(adjusted_cost) = update.adjusted_cost {
            self.adjusted_cost = adjusted_cost.max(Decimal::ZERO);
        }
        if let Some(ai_reasoning) = update.ai_reasoning {
            self.ai_reasoning = ai_reasoning;
        }
        if let Some(confidence_score) = update.confidence_score {
            if !confidence_score.is_finite() {
                return Err(DomainError::InvariantViolation(
                    "confidence score must be a finite number".to_string(),
                ));
            }
            self.confidence_score = confidence_score.clamp(0.0, 1.0);
        }
        if let Some(breakdown) = update.breakdown {
            self.total_cost = breakdown.total;
            self.breakdown = Some(breakdown);
        }
        if let Some(days) = update.estimated_delivery_days {
            self.estimated_delivery_days = days;
        }
        if let Some(reference) = update.quote_reference {
            if self.quote_reference.is_some() {
                return Err(DomainError::InvariantViolation(
                    "quote reference is assigned once per run".to_string(),
                ));
            }
            self.quote_reference = Some(reference);
        }

        Ok(())
    }

    /// Record handed to the backend under `reference`. `None` until the
    /// breakdown has been computed.
    pub fn persistence_record(&self, reference: &str) -> Option<QuoteRecord> {
        let breakdown = self.breakdown?;
        Some(QuoteRecord {
            reference: reference.to_string(),
            vehicle_type: self.input.vehicle_type,
            year: self.input.year,
            make: self.input.make.clone(),
            model: self.input.model.clone(),
            engine_size: self.input.engine_size,
            origin_country: self.input.origin_country.clone(),
            origin_port: self.input.origin_port.clone(),
            destination_country: self.input.destination_country.clone(),
            destination_port: self.input.destination_port.clone(),
            shipping_method: self.input.shipping_method,
            base_cost: self.base_cost,
            adjusted_cost: self.adjusted_cost,
            total_estimated: self.total_cost,
            breakdown,
            ai_reasoning: self.ai_reasoning.clone(),
            confidence_score: self.confidence_score,
            estimated_delivery_days: self.estimated_delivery_days,
            customer_email: self.input.customer_email.clone(),
            customer_name: self.input.customer_name.clone(),
            status: "pending".to_string(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub reference: String,
    pub vehicle_type: VehicleType,
    pub year: i32,
    pub make: String,
    pub model: String,
    pub engine_size: Option<u32>,
    pub origin_country: String,
    pub origin_port: Option<String>,
    pub destination_country: String,
    pub destination_port: Option<String>,
    pub shipping_method: ShippingMethod,
    #[serde(with = "rust_decimal::serde::float")]
    pub base_cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub adjusted_cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_estimated: Decimal,
    pub breakdown: CostBreakdown,
    pub ai_reasoning: String,
    pub confidence_score: f64,
    pub estimated_delivery_days: u32,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub status: String,
}

/// Response body of a completed quote run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteResult {
    pub success: bool,
    pub quote_reference: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub base_cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub adjusted_cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_cost: Decimal,
    pub breakdown: CostBreakdown,
    pub ai_reasoning: String,
    pub estimated_delivery_days: u32,
    pub confidence_score: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

impl QuoteResult {
    pub fn from_state(state: QuoteState, created_at: DateTime<Utc>) -> Result<Self, DomainError> {
        if state.status != QuoteStatus::Completed {
            return Err(DomainError::InvariantViolation(format!(
                "quote result requires a completed run, found {:?}",
                state.status
            )));
        }
        let (Some(quote_reference), Some(breakdown)) = (state.quote_reference, state.breakdown)
        else {
            return Err(DomainError::InvariantViolation(
                "completed quote is missing its reference or breakdown".to_string(),
            ));
        };

        Ok(Self {
            success: true,
            quote_reference,
            base_cost: state.base_cost,
            adjusted_cost: state.adjusted_cost,
            total_cost: state.total_cost,
            breakdown,
            ai_reasoning: state.ai_reasoning,
            estimated_delivery_days: state.estimated_delivery_days,
            confidence_score: state.confidence_score,
            created_at,
            messages: state.messages,
        })
    }
}
