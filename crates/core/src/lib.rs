pub mod config;
pub mod domain;
pub mod errors;
pub mod pricing;
pub mod rates;
pub mod reference;

pub use domain::document::{DocumentRequest, DocumentResponse, DocumentType};
pub use domain::notification::{DeliveryResult, DeliveryStatus, NotificationRequest};
pub use domain::quote::{
    CostBreakdown, QuoteInput, QuoteRecord, QuoteResult, QuoteState, QuoteStatus, ShippingMethod,
    StageUpdate, VehicleType,
};
pub use domain::shipment::{
    DelayPrediction, DelayPredictionRequest, DelayPredictionResponse, RiskLevel,
    RouteOptimization, RoutePriority, RouteRequest, RouteResponse,
};
pub use domain::support::{ChatRole, ChatTurn, SupportRequest, SupportResponse};
pub use errors::{ApplicationError, DomainError, InterfaceError, ValidationError};
pub use pricing::{DeterministicPricingEngine, PricingEngine};
pub use rates::RateTable;
