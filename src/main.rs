//! Stock prediction backend entry point.

use std::env;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stock_predictor::config::Config;
use stock_predictor::predictor::SubprocessPredictor;
use stock_predictor::state::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle --version / -V
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("stock-predictor {VERSION}");
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load().map_err(|e| {
        format!(
            "Failed to load configuration: {e}. \
             Make sure config.toml exists or set PREDICTOR__WORKER__SCRIPT and \
             PREDICTOR__WORKER__MODEL environment variables."
        )
    })?;
    tracing::info!(
        script = %config.worker.script,
        model = %config.worker.model,
        timeout_secs = config.worker.timeout_secs,
        "starting stock-predictor"
    );

    let predictor = Arc::new(SubprocessPredictor::new(config.worker.clone(), config.scaler));
    let state = Arc::new(AppState::new(config, predictor));

    // Start server
    let addr = format!("{}:{}", state.config.api.host, state.config.api.port);
    tracing::info!("Listening on {addr}");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, stock_predictor::app(state)).await?;

    Ok(())
}
