/*
 * Responsibility
 * - Config → services → Router
 * - Tracing / panic hook setup
 * - axum::serve()
 */
use std::{panic, process, sync::Arc};

use anyhow::Result;
use axum::{Router, routing::get};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::api::v1::handlers::health::health;
use crate::config::Config;
use crate::middleware;
use crate::services::auth::build_token_services;
use crate::services::users::StaticUserDirectory;
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,token_auth=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // stderr can be hidden depending on how the process is launched.
        tracing::error!(?info, "panic");

        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        algorithm = ?config.auth.signing_algorithm,
        ttl_seconds = config.auth.token_ttl_seconds,
        claims_format = ?config.auth.claims_format,
        users = config.users.len(),
        "starting auth service in {:?} mode on {}",
        config.app_env,
        config.addr
    );
    if config.users.is_empty() {
        tracing::warn!("AUTH_USERS is empty; every login will be rejected");
    }

    let state = build_state(&config)?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build process-level services and inject them into the shared state.
pub fn build_state(config: &Config) -> Result<AppState> {
    let (issuer, verifier) = build_token_services(&config.auth)?;
    let users = Arc::new(StaticUserDirectory::new(config.users.clone()));

    Ok(AppState::new(issuer, verifier, users))
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api::v1::routes(state.clone()))
        .with_state(state);

    middleware::http::apply(router, config.request_timeout, config.body_limit_bytes)
}
