use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use npuwatch_api::auth::bootstrap::ensure_default_admin;
use npuwatch_api::auth::jwt::JwtConfig;
use npuwatch_api::config::{resolve_config_path, AppConfig, LogConfig, CONFIG_PATH_ENV};
use npuwatch_api::llm::settings::LlmSettings;
use npuwatch_api::router::build_app_router;
use npuwatch_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config_path = resolve_config_path(std::env::args(), std::env::var(CONFIG_PATH_ENV).ok());
    let mut config = AppConfig::load(&config_path).expect("Failed to load configuration");
    config.apply_env_overrides();

    // --- Tracing ---
    init_tracing(&config.log);
    tracing::info!(
        path = %config_path.display(),
        host = %config.server.host,
        port = config.server.port,
        mode = %config.server.mode,
        llm_enabled = config.llm.enabled,
        "Loaded configuration"
    );

    // --- Database ---
    let pool = npuwatch_db::create_pool(&config.database_url(), config.database.max_open_conns)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    npuwatch_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    npuwatch_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    ensure_default_admin(&pool)
        .await
        .expect("Failed to seed default admin user");

    // --- App state ---
    let secret = config.jwt_secret().to_string();
    assert!(!secret.is_empty(), "jwt.secret or JWT_SECRET must be set");
    let jwt = JwtConfig::new(secret, config.jwt.expire_hour);

    let server = config.server.clone();
    let llm = LlmSettings::new(config, &config_path).expect("Failed to build LLM client");

    let state = AppState {
        pool,
        jwt: Arc::new(jwt),
        llm: Arc::new(llm),
    };

    let app = build_app_router(state, &server);

    // --- Start server ---
    let addr = SocketAddr::new(
        server.host.parse().expect("Invalid server.host address"),
        server.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Stdout always; a plain-text copy goes to `log.file` when set. `RUST_LOG`
/// overrides `log.level`.
fn init_tracing(log: &LogConfig) {
    let level = log.level.trim().to_lowercase();
    let default_filter =
        format!("npuwatch_api={level},npuwatch_db={level},tower_http={level}");

    let file_layer = (!log.file.trim().is_empty()).then(|| {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log.file.trim())
            .expect("Failed to open log file");
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
}

/// Wait for Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
