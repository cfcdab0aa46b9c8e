pub mod document;
pub mod notification;
pub mod quote;
pub mod shipment;
pub mod support;
