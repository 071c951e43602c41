//! HTTP server for the commerce rule engine.
//!
//! Usage: `commerce-rules [CONFIG_DIR]` (defaults to `./config`).

use std::env;
use std::process::ExitCode;

use commerce_rules::api::{AppState, create_router};
use commerce_rules::config::ConfigLoader;
use commerce_rules::logging;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config_dir = env::args().nth(1).unwrap_or_else(|| "./config".to_string());

    let loader = match ConfigLoader::load(&config_dir) {
        Ok(loader) => loader,
        Err(err) => {
            eprintln!("commerce-rules: {}", err);
            return ExitCode::FAILURE;
        }
    };
    let config = loader.config();
    logging::init(&config.logging.filter);

    let store = match loader.build_store() {
        Ok(store) => store,
        Err(err) => {
            error!(error = %err, "Failed to open rule store");
            return ExitCode::FAILURE;
        }
    };

    let router = create_router(AppState::new(store, config.service.clone()));
    let listener = match tokio::net::TcpListener::bind(&config.server.bind_address).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(address = %config.server.bind_address, error = %err, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };

    info!(
        service = %config.service.name,
        version = %config.service.version,
        address = %config.server.bind_address,
        "Commerce rule engine listening"
    );
    if let Err(err) = axum::serve(listener, router).await {
        error!(error = %err, "Server stopped");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
