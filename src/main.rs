use dotenvy::dotenv;
use school_registry::{
    api::{self, AppState},
    config::{database, settings},
    errors::Result,
    scheduler,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since variables can be set externally
    dotenv().ok();

    // 3. Load config.toml, apply environment overrides, validate once
    let app_config = settings::load_default_config()
        .and_then(|config| config.resolve(|key| std::env::var(key).ok()))
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    if app_config.attendance.api_token.is_none() {
        warn!("ATTENDANCE_API_TOKEN is not set; the trigger endpoints will answer 500");
    }

    // 4. Initialize database
    let db = database::init_database(&app_config.database.url)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Optional in-process scheduler
    let scheduler_task = app_config
        .scheduler
        .enabled
        .then(|| scheduler::spawn(db.clone(), app_config.scheduler.clone()));

    // 6. Serve the API until Ctrl-C
    let state = AppState::new(db, app_config.attendance.api_token.clone());
    let listener = TcpListener::bind(&app_config.server.bind_address)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", app_config.server.bind_address, e))?;
    info!("Listening on {}", app_config.server.bind_address);

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(task) = scheduler_task {
        task.abort();
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
