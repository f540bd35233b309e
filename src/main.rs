mod config;
mod db;
mod models;
mod retry;
mod routes;
mod services;
mod state;
mod store;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::state::{AppState, WebSettings};

#[tokio::main]
async fn main() {
    // A missing .env is normal outside development.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let pool = match db::init_pool(&config.database_url, config.db_max_connections).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "database init failed");
            std::process::exit(1);
        }
    };

    let state = AppState::new(pool, config.retry, WebSettings::from(&config));

    if let Some(admin) = &config.bootstrap_admin {
        match services::auth::bootstrap_admin(&state.store, &admin.email, &admin.password).await {
            Ok(true) => info!(email = %admin.email, "bootstrap admin created"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "bootstrap admin skipped"),
        }
    }

    let app = routes::app(state);
    let listener = match tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, port = config.port, "failed to bind");
            std::process::exit(1);
        }
    };

    info!(port = config.port, "pta-dashboard listening");
    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "server failed");
        std::process::exit(1);
    }
}
