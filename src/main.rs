use fan_gallery::{
    AppState,
    auth::{Account, Role},
    config::{AppConfig, AuthBackend, Env},
    create_router,
};
use fan_gallery::{
    GateState, JwtSessionGate, PgSessionStore, PostgresRepository, RepositoryState,
    SessionStoreState, StoredSessionGate,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// The asynchronous entry point, responsible for initializing all core
/// components: configuration, logging, database, the Identity Gate, and the
/// HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (fail-fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging filter setup: RUST_LOG wins, with sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fan_gallery=debug,tower_http=info,axum=trace".into());

    // 3. Initialize logging based on environment.
    match config.env {
        Env::Local => {
            // LOCAL: pretty output for human readability.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON output for centralized log aggregators.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database initialization (Postgres).
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: database migration failed");

    let storage_timeout = Duration::from_secs(config.storage_timeout_secs);

    // Instantiate the repository behind its trait object for injection.
    let repo =
        Arc::new(PostgresRepository::new(pool.clone(), storage_timeout)) as RepositoryState;

    // 5. Identity Gate assembly: the configured moderator account plus the
    // selected backing strategy.
    let accounts = vec![Account {
        identity: config.moderator_identity.clone(),
        secret: config.moderator_secret.clone(),
        role: Role::Moderator,
    }];

    let gate: GateState = match config.auth_backend {
        AuthBackend::Database => {
            let store =
                Arc::new(PgSessionStore::new(pool, storage_timeout)) as SessionStoreState;
            Arc::new(StoredSessionGate::new(
                store,
                accounts,
                config.session_ttl_secs,
            ))
        }
        AuthBackend::Jwt => Arc::new(JwtSessionGate::new(
            &config.session_secret,
            accounts,
            config.session_ttl_secs,
        )),
    };

    tracing::info!("Identity gate backend: {:?}", config.auth_backend);

    // 6. Unified state assembly and router startup.
    let app_state = AppState::new(repo, gate, config);
    let app = create_router(app_state);

    let listener = TcpListener::bind("0.0.0.0:3000")
        .await
        .expect("FATAL: failed to bind 0.0.0.0:3000");

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on 0.0.0.0:3000");
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:3000/swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: server error");
}
