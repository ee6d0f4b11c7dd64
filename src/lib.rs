pub mod analytics;
pub mod api;
pub mod config;
pub mod core_state;
pub mod db;
pub mod followups;
pub mod models;
pub mod patients;
pub mod schedule;
pub mod summary_cache;
pub mod voice;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Start the desk: logging, store, providers, then the HTTP server until Ctrl-C.
pub fn run() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = config::ClinicConfig::from_env();
    let bind_addr = config.bind_addr;

    // Provider clients are blocking reqwest clients: build them before the runtime exists.
    let core = core_state::CoreState::from_config(config)
        .map_err(|e| format!("Failed to initialise clinic state: {e}"))?;
    let core = Arc::new(core);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {e}"))?;

    // The last handle to `core` must drop outside the runtime.
    let serving = Arc::clone(&core);
    let result = runtime.block_on(async move {
        let mut server = api::start_api_server(serving, bind_addr).await?;
        tracing::info!(addr = %server.session.server_addr, "Listening");

        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Cannot listen for Ctrl-C: {e}");
        }
        server.shutdown();
        server.stopped().await;
        Ok::<(), String>(())
    });
    drop(runtime);
    drop(core);
    result
}
