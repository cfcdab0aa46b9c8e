//! Agents behind the ShipWithGlowie AI service.
//!
//! The quote pipeline (`quote`) is the only multi-stage flow; route, delay,
//! document and support are single completion calls run through
//! [`single_call::run_single_call`], each with a deterministic fallback.
//!
//! The model never sets prices directly. It proposes a market adjustment that
//! [`guardrails::PricingGuardrail`] bounds before the deterministic pricing
//! engine applies it.

pub mod cache;
pub mod delay;
pub mod document;
pub mod extract;
pub mod guardrails;
pub mod llm;
pub mod notification;
pub mod prompts;
pub mod quote;
pub mod record_store;
pub mod route;
pub mod runtime;
pub mod single_call;
pub mod support;

pub use runtime::{AgentRuntime, RuntimeServices};
