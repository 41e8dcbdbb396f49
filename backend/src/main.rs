//! Server entry-point: loads settings, wires stores and adapters, and serves
//! the ingestion, webhook and probe endpoints.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

mod server;

use actix_web::web;
use ortho_config::OrthoConfig;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use schedule_watch::inbound::http::health::HealthState;
use server::{ServerSettings, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServerSettings::load_from_iter(std::env::args_os())
        .map_err(|e| std::io::Error::other(format!("failed to load settings: {e}")))?;

    let health_state = web::Data::new(HealthState::new());
    let (server, refresh) = create_server(health_state.clone(), &settings).await?;
    let result = server.await;

    health_state.mark_unhealthy();
    if let Some(refresh) = refresh {
        refresh.abort();
    }
    result
}
