// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Waflow: outbound delivery-reliability engine for WhatsApp campaigns.
//!
//! Binary entry point: loads and validates configuration, then serves the
//! webhook/reconciliation gateway.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Waflow delivery-reliability engine.
#[derive(Parser, Debug)]
#[command(name = "waflow", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook/reconciliation gateway.
    Serve,
    /// Print the effective configuration (secrets redacted).
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match waflow_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            waflow_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log.level);

    match cli.command {
        Some(Commands::Config) => {
            let mut redacted = config.clone();
            if !redacted.webhook.app_secret.is_empty() {
                redacted.webhook.app_secret = "[redacted]".to_string();
            }
            if !redacted.webhook.verify_token.is_empty() {
                redacted.webhook.verify_token = "[redacted]".to_string();
            }
            match toml::to_string_pretty(&redacted) {
                Ok(rendered) => println!("{rendered}"),
                Err(e) => {
                    eprintln!("waflow: failed to render config: {e}");
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Serve) | None => {
            if let Err(e) = serve(config).await {
                tracing::error!(error = %e, "server exited with error");
                std::process::exit(1);
            }
        }
    }
}

async fn serve(config: waflow_config::WaflowConfig) -> Result<(), waflow_core::WaflowError> {
    let db = waflow_storage::Database::open(&config.storage.path).await?;
    tracing::info!(path = %config.storage.path, "storage ready");

    if config.webhook.app_secret.is_empty() {
        tracing::warn!(
            "no webhook app secret configured; signature verification is in \
             compatibility mode and every callback will be accepted"
        );
    }

    let state = waflow_gateway::GatewayState {
        db,
        app_secret: config.webhook.app_secret,
        verify_token: config.webhook.verify_token,
        suppression: config.suppression,
    };
    let server_config = waflow_gateway::ServerConfig {
        host: config.gateway.host,
        port: config.gateway.port,
    };

    tokio::select! {
        result = waflow_gateway::start_server(&server_config, state) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
            Ok(())
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("waflow={level},tower_http=warn")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
