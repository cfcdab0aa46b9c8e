use clap::Parser;
use glowie_agent::RuntimeServices;
use glowie_cli::commands::quote::{execute, QuoteArgs};
use glowie_cli::Cli;
use glowie_core::{QuoteInput, ShippingMethod, VehicleType};
use serde_json::Value;

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn camry(year: i32) -> QuoteInput {
    QuoteInput::new(VehicleType::Sedan, year, "Toyota", "Camry", "Japan", ShippingMethod::Roro)
}

#[test]
fn offline_quote_prints_deterministic_quote() {
    let result = execute(RuntimeServices::offline(), camry(2020));
    assert_eq!(result.exit_code, 0, "expected quote to succeed offline");

    let payload = parse_payload(&result.output);
    assert_eq!(payload["success"], true);
    assert_eq!(payload["base_cost"], 1500.0);
    assert_eq!(payload["total_cost"], 3064.0);
    assert_eq!(payload["estimated_delivery_days"], 45);
    assert_eq!(payload["ai_reasoning"], "Standard pricing applied (AI unavailable)");
}

#[test]
fn invalid_year_exits_with_validation_code() {
    let result = execute(RuntimeServices::offline(), camry(1980));
    assert_eq!(result.exit_code, 2);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "quote");
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["error_class"], "invalid_year");
    assert_eq!(payload["message"], "Invalid vehicle year");
}

#[test]
fn quote_arguments_parse_case_insensitively() {
    let parsed = Cli::try_parse_from([
        "glowie",
        "quote",
        "--vehicle-type",
        "SUV",
        "--year",
        "2019",
        "--make",
        "Ford",
        "--model",
        "Explorer",
        "--origin",
        "UAE",
        "--method",
        "Container",
        "--offline",
    ]);
    assert!(parsed.is_ok(), "expected quote arguments to parse: {parsed:?}");
}

#[test]
fn unknown_vehicle_type_is_rejected_by_the_parser() {
    let parsed = Cli::try_parse_from([
        "glowie", "quote", "--vehicle-type", "hovercraft", "--year", "2019", "--make", "A",
        "--model", "B", "--origin", "UK",
    ]);
    assert!(parsed.is_err());
}

#[test]
fn quote_args_keep_destination_defaults() {
    let args = QuoteArgs {
        vehicle_type: VehicleType::Van,
        year: 2018,
        make: "Toyota".to_string(),
        model: "Hiace".to_string(),
        origin: "UK".to_string(),
        method: ShippingMethod::Roro,
        engine_size: Some(2800),
    };

    let input = args.into_input();
    assert_eq!(input.destination_country, "Uganda");
    assert_eq!(input.engine_size, Some(2800));
}
