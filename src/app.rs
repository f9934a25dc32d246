/*
 * Responsibility
 * - Config 読み込み → authority discovery / JWKS → interceptor chain 構築
 * - Router 組み立て (public + chain 付き rpc) と middleware の適用
 * - axum::serve() で起動
 */
use std::{panic, process};

use anyhow::{Context, Result};
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::middleware;
use crate::services::auth::build_interceptor_chain;
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,video_rpc_auth=debug,tower_http=debug cargo run
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
        tracing::error!(?info, "panic");

        // Development: crash the whole process so we notice immediately.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env().context("load config")?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting in {:?} mode on {} ({:?})",
        config.app_env,
        config.addr,
        config
    );

    // Signing keys are fetched here, once, before serving begins.
    let state = build_state(&config).await?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("bind {}", config.addr))?;
    axum::serve(listener, app).await.context("serve")?;

    Ok(())
}

async fn build_state(config: &Config) -> Result<AppState> {
    let chain = build_interceptor_chain(config).await?;
    Ok(AppState::new(chain))
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let rpc = middleware::auth::access::apply(api::rpc(), state.chain.clone());

    let router = Router::new().merge(api::public()).merge(rpc);

    let router = middleware::cors::apply(router, config);
    middleware::http::apply(router, config)
}
