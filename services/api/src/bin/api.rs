//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{default_candidates, DbAdapter, DocxTextReader, PythonAgentAdapter},
    config::Config,
    error::ApiError,
    web::{router, AppState},
};
use lecture_agent_core::ports::DatabaseService;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Connects to the database and runs migrations, or explains why auth and
/// history will be unavailable.
async fn connect_database(config: &Config) -> Option<Arc<dyn DatabaseService>> {
    let Some(database_url) = config.database_url.as_deref() else {
        warn!("DATABASE_URL not set; auth and history endpoints are disabled");
        return None;
    };

    info!("Connecting to database...");
    let db_pool = match PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            warn!("Database connection failed, auth and history are disabled: {}", e);
            return None;
        }
    };

    let db_adapter = DbAdapter::new(db_pool);
    info!("Running database migrations...");
    if let Err(e) = db_adapter.run_migrations().await {
        warn!("Database migrations failed, auth and history are disabled: {}", e);
        return None;
    }
    info!("Database migrations complete.");
    let db: Arc<dyn DatabaseService> = Arc::new(db_adapter);
    Some(db)
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database (optional) ---
    let db = connect_database(&config).await;

    // --- 3. Initialize Service Adapters ---
    let candidates = default_candidates(config.python_override.as_deref());
    info!(
        "Agent module '{}' will be run with the first of: {}",
        config.agent_module,
        candidates
            .iter()
            .map(|c| c.program.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    let agent = Arc::new(PythonAgentAdapter::new(
        candidates,
        config.agent_module.clone(),
        config.agent_dir.clone(),
    ));
    let documents = Arc::new(DocxTextReader);

    tokio::fs::create_dir_all(&config.workspace_dir).await?;
    info!("Job workspaces live under {}", config.workspace_dir.display());

    // --- 4. Build the Shared AppState and Router ---
    let app_state = Arc::new(AppState::new(db, config.clone(), agent, documents));
    let app = router(app_state);

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
