use rust_decimal::Decimal;
use serde_json::Value;
use tera::{Context, Tera};
use thiserror::Error;

use glowie_core::{DelayPredictionRequest, DocumentType, QuoteInput, RouteRequest};

const QUOTE_ADJUSTMENT: &str = "quote_adjustment.txt";
const ROUTE_OPTIMIZATION: &str = "route_optimization.txt";
const DELAY_PREDICTION: &str = "delay_prediction.txt";
const SUPPORT_SYSTEM: &str = "support_system.txt";

pub const COMPANY_NAME: &str = "ShipWithGlowie";

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("template error: {0}")]
    Template(String),
}

impl From<tera::Error> for PromptError {
    fn from(error: tera::Error) -> Self {
        Self::Template(error.to_string())
    }
}

/// Prompt templates compiled into the binary.
#[derive(Clone, Debug)]
pub struct PromptLibrary {
    tera: Tera,
}

impl PromptLibrary {
    pub fn embedded() -> Result<Self, PromptError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (QUOTE_ADJUSTMENT, include_str!("../templates/quote_adjustment.txt")),
            (ROUTE_OPTIMIZATION, include_str!("../templates/route_optimization.txt")),
            (DELAY_PREDICTION, include_str!("../templates/delay_prediction.txt")),
            (SUPPORT_SYSTEM, include_str!("../templates/support_system.txt")),
        ])?;
        Ok(Self { tera })
    }

    pub fn quote_adjustment(
        &self,
        input: &QuoteInput,
        base_cost: Decimal,
        month: &str,
        bounds: (Decimal, Decimal),
    ) -> Result<String, PromptError> {
        let mut context = Context::new();
        context.insert("year", &input.year);
        context.insert("make", &input.make);
        context.insert("model", &input.model);
        context.insert("vehicle_type", input.vehicle_type.as_str());
        context.insert("origin_country", &input.origin_country);
        context.insert("destination_country", &input.destination_country);
        context.insert("shipping_method", input.shipping_method.as_str());
        context.insert("base_cost", &format!("{base_cost:.2}"));
        context.insert("month", month);
        context.insert("min_adjustment", &bounds.0.to_string());
        context.insert("max_adjustment", &bounds.1.to_string());
        Ok(self.tera.render(QUOTE_ADJUSTMENT, &context)?)
    }

    pub fn route_optimization(&self, request: &RouteRequest) -> Result<String, PromptError> {
        let mut context = Context::new();
        context.insert("origin", &request.origin);
        context.insert("destination", &request.destination);
        context.insert("priority", request.priority.as_str());
        context.insert("vehicle_type", request.vehicle_type_or_default().as_str());
        Ok(self.tera.render(ROUTE_OPTIMIZATION, &context)?)
    }

    pub fn delay_prediction(
        &self,
        request: &DelayPredictionRequest,
        today: &str,
    ) -> Result<String, PromptError> {
        let mut context = Context::new();
        context.insert("origin", &request.origin);
        context.insert("destination", &request.destination);
        context.insert("current_status", &request.current_status);
        context.insert("current_location", request.current_location.as_deref().unwrap_or("Unknown"));
        context.insert("expected_delivery", request.expected_delivery.as_deref().unwrap_or("None"));
        context.insert("today", today);
        Ok(self.tera.render(DELAY_PREDICTION, &context)?)
    }

    pub fn support_system(
        &self,
        shipment_id: Option<i64>,
        shipment: Option<&Value>,
    ) -> Result<String, PromptError> {
        let mut context = Context::new();
        context.insert("company", COMPANY_NAME);
        context.insert("shipment_id", &shipment_id.unwrap_or_default());
        let rendered_shipment = match shipment {
            Some(record) => serde_json::to_string_pretty(record)
                .map_err(|error| PromptError::Template(error.to_string()))?,
            None => String::new(),
        };
        context.insert("shipment", &rendered_shipment);
        Ok(self.tera.render(SUPPORT_SYSTEM, &context)?)
    }
}

/// System prompt naming the fields to pull out of a document of the given type.
pub fn document_extraction(document_type: DocumentType) -> &'static str {
    match document_type {
        DocumentType::VehicleRegistration => {
            "Extract: Vehicle Make, Model, Year, VIN, Registration Number, Owner Name, Registration Date, Engine Number, Color. Return as JSON."
        }
        DocumentType::BillOfLading => {
            "Extract: Shipper Name, Consignee Name, Vessel Name, Port of Loading, Port of Discharge, Container Number, Booking Number, Date. Return as JSON."
        }
        DocumentType::Invoice => {
            "Extract: Invoice Number, Date, Seller, Buyer, Total Amount, Currency, Items, Payment Terms. Return as JSON."
        }
        DocumentType::CustomsDeclaration => {
            "Extract: Declaration Number, Date, Importer, Exporter, Country of Origin, Destination, HS Code, Declared Value. Return as JSON."
        }
        DocumentType::InsuranceCertificate | DocumentType::Other => {
            "Extract all relevant information from this document as JSON."
        }
    }
}
