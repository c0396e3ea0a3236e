use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use library_backend::config::Config;
use library_backend::db::{Database, seed_sample_data};
use library_backend::{AppState, build_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "library_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting Library Backend");
    let config = Config::from_env()?;
    info!("Configuration loaded");

    let db = Database::connect(&config.database_url, config.database_max_connections).await?;
    let created = db.migrate().await?;
    if !created.is_empty() {
        info!(tables = ?created, "Created missing tables");
    }
    info!("Database connected");

    if config.seed_sample_data {
        seed_sample_data(&db).await?;
    }

    let addr = config.bind_addr();
    let state = AppState::new(config, db.clone());
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);
    info!("GraphQL playground: http://{}/graphql", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
