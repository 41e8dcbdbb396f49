//! Server construction and background refresh wiring.

mod config;
mod state_builders;

pub use config::ServerSettings;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use tokio::task::JoinHandle;
use tracing::{error, info};

use schedule_watch::domain::ports::ScheduleUpdateCommand;
use schedule_watch::inbound::http::health::{HealthState, live, ready};
use schedule_watch::inbound::http::json_config;
use schedule_watch::inbound::http::schedule::{apply_update, refresh_schedule};
use schedule_watch::inbound::http::state::HttpState;
use schedule_watch::inbound::http::telegram::receive_message;
use schedule_watch::{Trace, TraceId};

use state_builders::{build_services, build_stores};

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(json_config())
        .wrap(Trace)
        .service(apply_update)
        .service(refresh_schedule)
        .service(receive_message)
        .service(ready)
        .service(live)
}

/// Build adapters and services from `settings` and bind the HTTP server.
///
/// # Errors
/// Propagates [`std::io::Error`] when settings are invalid, the database is
/// unreachable, or the socket cannot be bound.
pub async fn create_server(
    health_state: web::Data<HealthState>,
    settings: &ServerSettings,
) -> std::io::Result<(Server, Option<JoinHandle<()>>)> {
    let format = settings.schedule_format().map_err(std::io::Error::other)?;
    let bind_addr: SocketAddr = settings.bind_addr().map_err(std::io::Error::other)?;
    let stores = build_stores(settings, &format).await?;
    let services = build_services(settings, format, stores)?;

    let refresh = settings
        .refresh_interval()
        .map(|period| spawn_refresh_loop(services.updates.clone(), period));

    let http_state = web::Data::new(services.http_state);
    let server_health_state = health_state.clone();
    let server = HttpServer::new(move || {
        build_app(server_health_state.clone(), http_state.clone())
    })
    .bind(bind_addr)?
    .run();

    info!(%bind_addr, "schedule watch listening");
    health_state.mark_ready();
    Ok((server, refresh))
}

/// Run `refresh_from_source` every `period`, one cycle at a time.
fn spawn_refresh_loop(updates: Arc<dyn ScheduleUpdateCommand>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let trace_id = TraceId::generate();
            match TraceId::scope(trace_id, updates.refresh_from_source()).await {
                Ok(report) => info!(
                    trace_id = %trace_id,
                    received = report.received,
                    changed = report.reconcile.has_changes(),
                    "scheduled refresh finished"
                ),
                Err(err) => error!(
                    trace_id = %trace_id,
                    code = ?err.code(),
                    error = %err,
                    "scheduled refresh failed"
                ),
            }
        }
    })
}
