use anyhow::Context;
use granthalaya_ledger::{
    adapters::{memory, postgres},
    api::{handlers::AppState, router::create_router},
    application::ServiceDependencies,
    config::{AppConfig, DatabaseConfig, StorageBackend},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize adapters
    let service_deps = match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            memory::service_dependencies()
        }
        StorageBackend::Postgres => connect_postgres(&config.database).await?,
    };

    // Create application state
    let app_state = Arc::new(AppState { service_deps });

    // Create router
    let app = create_router(app_state);

    // Server configuration
    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    // Start server
    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}

/// 接続プールを作成し、マイグレーションを適用する
async fn connect_postgres(database: &DatabaseConfig) -> anyhow::Result<ServiceDependencies> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(database.max_connections)
        .connect(&database.url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Connected to PostgreSQL");
    Ok(postgres::service_dependencies(pool))
}
