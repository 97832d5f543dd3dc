use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use json_relay::{server, telemetry, Cli, Relay, ServiceConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ServiceConfig::load(&cli) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("json-relay: {e}");
            return ExitCode::from(2);
        }
    };

    telemetry::init(config.log_format);
    config.log_summary();

    let relay = match Relay::from_config(&config) {
        Ok(relay) => Arc::new(relay),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create mail transport");
            return ExitCode::from(2);
        }
    };

    if let Err(e) = server::serve(config, relay).await {
        tracing::error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
