use access_service::{
    AppState, SERVICE_NAME, build_router,
    config::get_configuration,
    db::{self, PgCodeStore},
    observability::init_tracing,
    services::CodeStore,
};
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let settings = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(SERVICE_NAME, &settings.log_level);

    info!(
        service = SERVICE_NAME,
        version = env!("CARGO_PKG_VERSION"),
        "Starting access service"
    );

    let pool = db::connect_with_retry(&settings.database).await?;
    db::init_schema(&pool).await?;
    let store: Arc<dyn CodeStore> = Arc::new(PgCodeStore::new(pool));

    let state = AppState::new(settings, store);
    let address = format!(
        "{}:{}",
        state.settings.server.host, state.settings.server.port
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!("Starting {} on {}", SERVICE_NAME, address);
    axum::serve(listener, app).await.map_err(|e| {
        tracing::error!("Server error: {}", e);
        anyhow::anyhow!("Server error: {}", e)
    })?;

    Ok(())
}
