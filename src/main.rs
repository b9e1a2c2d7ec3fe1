use anyhow::Context;
use collective_portal::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    identity::{IdentityState, SupabaseIdentity},
    repository::{DataState, InMemoryClient, PostgresClient},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, connects the data and identity clients
/// and serves the router.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Configuration (fail fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load()?;

    // 2. Logging: RUST_LOG wins, otherwise debug for this crate.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "collective_portal=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);
    if config.env == Env::Local {
        tracing::warn!("x-user-id development sessions are enabled; set APP_ENV=production to disable them");
    }

    // 3. Data client: Postgres when configured, in-memory otherwise (local only).
    let data: DataState = match &config.db_url {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .context("failed to connect to Postgres, check DATABASE_URL")?;

            if config.run_migrations {
                sqlx::migrate!()
                    .run(&pool)
                    .await
                    .context("failed to apply migrations")?;
                tracing::info!("migrations applied");
            }
            Arc::new(PostgresClient::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory data client");
            Arc::new(InMemoryClient::new())
        }
    };

    // 4. Identity provider
    let identity: IdentityState = Arc::new(SupabaseIdentity::new(&config));

    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState {
        data,
        identity,
        config,
    });

    // 5. Server
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app).await?;
    Ok(())
}
