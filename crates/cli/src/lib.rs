pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "glowie",
    about = "ShipWithGlowie AI service operator CLI",
    long_about = "Inspect configuration, check provider readiness, and run the quote pipeline locally.",
    after_help = "Examples:\n  glowie doctor --json\n  glowie config\n  glowie quote --vehicle-type suv --year 2019 --make Ford --model Explorer --origin UAE --method container --offline"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, completion provider readiness, and backend URL")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run the quote pipeline and print the quote as JSON")]
    Quote {
        #[command(flatten)]
        vehicle: commands::quote::QuoteArgs,
        #[arg(long, help = "Skip the completion provider and backend; price deterministically")]
        offline: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Quote { vehicle, offline } => commands::quote::run(vehicle, offline),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
