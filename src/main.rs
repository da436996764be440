//! Countdown Keeper - A state-managed HTTP server for countdown timers
//!
//! This is the main entry point for the countdown-keeper application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use countdown_keeper::{
    api::create_router,
    config::Config,
    state::{AppState, TimerEngine},
    storage::{FileStore, TimerRepository},
    tasks::completion_alert_task,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("countdown_keeper={},tower_http=info", config.log_level()))
        .init();

    info!("Starting countdown-keeper server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, data_dir={}, tick={}ms",
          config.host, config.port, config.data_dir.display(), config.tick_ms);

    // Open persistence and restore the last saved timers
    let store = FileStore::open(&config.data_dir).await?;
    let repository = TimerRepository::new(Arc::new(store));
    let engine = TimerEngine::new(repository, config.tick_period());
    engine.load().await;

    // Surface completions as they happen
    tokio::spawn(completion_alert_task(Arc::clone(&engine)));

    let state = Arc::new(AppState::new(Arc::clone(&engine), config.port, config.host.clone()));
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /timers            - List timers (?category=)");
    info!("  POST /timers            - Create a timer");
    info!("  GET  /timers/grouped    - Timers grouped by category");
    info!("  GET  /timers/:id        - Get one timer");
    info!("  POST /timers/:id/start  - Start a countdown");
    info!("  POST /timers/:id/pause  - Pause a countdown");
    info!("  POST /timers/:id/reset  - Reset a timer");
    info!("  GET  /history           - Completion history (?category=)");
    info!("  GET  /status            - Timer counts and uptime");
    info!("  GET  /health            - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    engine.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}
