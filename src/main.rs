mod config;
mod db;
mod event;
mod hub;
mod ordering;
mod routes;
mod services;
mod state;

use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use crate::config::Config;
use crate::event::ErrorCode;
use crate::hub::Hub;
use crate::services::access::PgAccessControl;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(code = e.error_code(), error = %e, "configuration invalid");
            return ExitCode::FAILURE;
        }
    };

    let pool = match db::init_pool(&config.database_url, config.db_max_connections).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "database init failed");
            return ExitCode::FAILURE;
        }
    };

    let hub = Hub::spawn(config.hub);
    let access = Arc::new(PgAccessControl::new(pool.clone()));
    let state = state::AppState::new(pool, hub, access, config.retry);

    let app = routes::app(state);
    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, port = config.port, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    info!(port = config.port, queue_capacity = config.hub.queue_capacity, "taskboard listening");
    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "server failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
