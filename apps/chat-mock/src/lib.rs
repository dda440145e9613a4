#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::info;

use crate::{
    config::Config,
    db::MockDb,
    dialog::SchemaDialogResolver,
    identity::RandomIdentitySynthesizer,
    server::{AppState, build_router},
};

pub mod assistants;
pub mod autopilot;
pub mod channels;
pub mod chat_token;
pub mod config;
pub mod db;
pub mod dialog;
pub mod identity;
pub mod messages;
pub mod sdk_asset;
pub mod server;
pub mod types;

pub fn build_app_state(config: Config) -> AppState {
    let db = MockDb::memory();
    let ids = Arc::new(RandomIdentitySynthesizer::from_seed(config.id_seed));
    let resolver = Arc::new(SchemaDialogResolver::new(db.clone()));
    AppState::new(config, db, ids, resolver)
}

pub fn build_app(config: Config) -> axum::Router {
    build_router(build_app_state(config))
}

pub async fn serve(config: Config) -> Result<()> {
    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(
        service = %config.service_name,
        bind_addr = %config.bind_addr,
        sdk_host = %config.sdk_host,
        seeded_ids = config.id_seed.is_some(),
        "chat mock service listening"
    );
    axum::serve(listener, build_app(config))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("chat mock service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
