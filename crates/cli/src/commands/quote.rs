use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use glowie_agent::cache::{Cache, InMemoryCache, NoopCache};
use glowie_agent::llm::OpenAiCompatClient;
use glowie_agent::quote::QuoteError;
use glowie_agent::record_store::HttpRecordStore;
use glowie_agent::{AgentRuntime, RuntimeServices};
use glowie_core::config::{AppConfig, LoadOptions};
use glowie_core::{QuoteInput, ShippingMethod, VehicleType};

use super::CommandResult;

#[derive(Clone, Debug, Args)]
pub struct QuoteArgs {
    #[arg(long, help = "sedan|suv|truck|van|luxury|motorcycle")]
    pub vehicle_type: VehicleType,
    #[arg(long)]
    pub year: i32,
    #[arg(long)]
    pub make: String,
    #[arg(long)]
    pub model: String,
    #[arg(long, help = "Origin country, e.g. Japan, UK, UAE, USA")]
    pub origin: String,
    #[arg(long, default_value = "roro", help = "roro|container")]
    pub method: ShippingMethod,
    #[arg(long, help = "Engine size in cc")]
    pub engine_size: Option<u32>,
}

impl QuoteArgs {
    pub fn into_input(self) -> QuoteInput {
        let mut input = QuoteInput::new(
            self.vehicle_type,
            self.year,
            self.make,
            self.model,
            self.origin,
            self.method,
        );
        input.engine_size = self.engine_size;
        input
    }
}

pub fn run(args: QuoteArgs, offline: bool) -> CommandResult {
    let services = if offline { Ok(RuntimeServices::offline()) } else { configured_services() };
    match services {
        Ok(services) => execute(services, args.into_input()),
        Err(failure) => failure,
    }
}

fn configured_services() -> Result<RuntimeServices, CommandResult> {
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure("quote", "config_validation", error.to_string(), 2)
    })?;
    let completion = OpenAiCompatClient::from_config(&config.llm).map_err(|error| {
        CommandResult::failure("quote", "completion_provider", error.to_string(), 1)
    })?;
    let records = HttpRecordStore::from_config(&config.backend)
        .map_err(|error| CommandResult::failure("quote", "record_store", error.to_string(), 1))?;
    let cache: Arc<dyn Cache> =
        if config.cache.enabled { Arc::new(InMemoryCache::new()) } else { Arc::new(NoopCache) };

    Ok(RuntimeServices {
        completion: Arc::new(completion),
        records: Arc::new(records),
        cache,
        cache_ttl: Duration::from_secs(config.cache.ttl_secs),
        ..RuntimeServices::offline()
    })
}

pub fn execute(services: RuntimeServices, input: QuoteInput) -> CommandResult {
    let runtime = match AgentRuntime::new(services) {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure("quote", "prompt_templates", error.to_string(), 1)
        }
    };
    let executor = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(executor) => executor,
        Err(error) => {
            return CommandResult::failure(
                "quote",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                1,
            )
        }
    };

    match executor.block_on(runtime.generate_quote(input)) {
        Ok(result) => match serde_json::to_string_pretty(&result) {
            Ok(output) => CommandResult { exit_code: 0, output },
            Err(error) => CommandResult::failure("quote", "serialization", error.to_string(), 1),
        },
        Err(QuoteError::Validation(error)) => {
            CommandResult::failure("quote", error.code(), error.to_string(), 2)
        }
        Err(error) => CommandResult::failure("quote", "pipeline", error.to_string(), 1),
    }
}
