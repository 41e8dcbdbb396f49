//! Builders wiring adapters into the domain services.

use std::io;
use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use tracing::{info, warn};

use schedule_watch::domain::ports::{
    MessageSink, ScheduleRepository, ScheduleSource, ScheduleUpdateCommand, SubscriberRepository,
    SubscriptionCommand,
};
use schedule_watch::domain::{
    Notifier, ScheduleExtractor, ScheduleFormat, ScheduleReconciler, ScheduleUpdateService,
    SubscriptionService,
};
use schedule_watch::inbound::http::state::HttpState;
use schedule_watch::outbound::memory::{InMemoryScheduleRepository, InMemorySubscriberRepository};
use schedule_watch::outbound::persistence::{
    DbPool, DieselScheduleRepository, DieselSubscriberRepository, PoolConfig,
    run_pending_migrations,
};
use schedule_watch::outbound::schedule_page::{
    HttpSchedulePageSource, UnconfiguredSchedulePageSource,
};
use schedule_watch::outbound::telegram::TelegramMessageSink;

use super::ServerSettings;

/// Store adapters selected by configuration.
pub(super) struct Stores {
    pub(super) schedule: Arc<dyn ScheduleRepository>,
    pub(super) subscribers: Arc<dyn SubscriberRepository>,
}

/// Driving ports shared by the HTTP handlers and the refresh loop.
pub(super) struct AppServices {
    pub(super) updates: Arc<dyn ScheduleUpdateCommand>,
    pub(super) http_state: HttpState,
}

/// Connect to PostgreSQL and apply migrations when a database URL is set,
/// otherwise fall back to process-local stores.
pub(super) async fn build_stores(
    settings: &ServerSettings,
    format: &ScheduleFormat,
) -> io::Result<Stores> {
    let Some(database_url) = settings.database_url.as_deref() else {
        warn!("no database URL configured; schedule and subscribers live in memory");
        return Ok(Stores {
            schedule: Arc::new(InMemoryScheduleRepository::new()),
            subscribers: Arc::new(InMemorySubscriberRepository::new()),
        });
    };

    run_pending_migrations(database_url)
        .await
        .map_err(io::Error::other)?;
    let pool = DbPool::new(
        PoolConfig::new(database_url).with_max_size(settings.db_max_connections()),
    )
    .await
    .map_err(io::Error::other)?;
    info!("connected to PostgreSQL");
    Ok(Stores {
        schedule: Arc::new(DieselScheduleRepository::new(pool.clone(), format.separator)),
        subscribers: Arc::new(DieselSubscriberRepository::new(pool)),
    })
}

fn build_sink(settings: &ServerSettings) -> io::Result<Arc<dyn MessageSink>> {
    let token = settings.telegram_token().map_err(io::Error::other)?;
    let api_base = settings.telegram_api_base().map_err(io::Error::other)?;
    let sink = TelegramMessageSink::new(api_base, token, settings.send_timeout())
        .map_err(io::Error::other)?;
    Ok(Arc::new(sink))
}

fn build_source(settings: &ServerSettings) -> io::Result<Arc<dyn ScheduleSource>> {
    match settings.schedule_page_url().map_err(io::Error::other)? {
        Some(page) => {
            let source = HttpSchedulePageSource::new(page, settings.page_timeout())
                .map_err(io::Error::other)?;
            Ok(Arc::new(source))
        }
        None => Ok(Arc::new(UnconfiguredSchedulePageSource)),
    }
}

/// Compose the update and subscription services over `stores`.
pub(super) fn build_services(
    settings: &ServerSettings,
    format: ScheduleFormat,
    stores: Stores,
) -> io::Result<AppServices> {
    let sink = build_sink(settings)?;
    let source = build_source(settings)?;
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    Ok(wire_services(format, stores, sink, source, clock))
}

/// Wire services from already-built adapters.
pub(super) fn wire_services(
    format: ScheduleFormat,
    stores: Stores,
    sink: Arc<dyn MessageSink>,
    source: Arc<dyn ScheduleSource>,
    clock: Arc<dyn Clock>,
) -> AppServices {
    let notifier = Notifier::new(stores.subscribers.clone(), sink.clone(), format.clone());
    let updates: Arc<dyn ScheduleUpdateCommand> = Arc::new(ScheduleUpdateService::new(
        source,
        ScheduleExtractor::new(format.clone()),
        ScheduleReconciler::new(stores.schedule.clone()),
        notifier.clone(),
        clock,
    ));
    let subscriptions: Arc<dyn SubscriptionCommand> = Arc::new(SubscriptionService::new(
        stores.subscribers,
        stores.schedule,
        sink,
        notifier,
        format.queue_count,
    ));
    AppServices {
        updates: updates.clone(),
        http_state: HttpState::new(updates, subscriptions, format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schedule_watch::domain::ports::{FixtureMessageSink, FixtureScheduleSource};

    #[tokio::test]
    async fn wired_state_uses_configured_format() {
        let format = ScheduleFormat {
            separator: '|',
            ..ScheduleFormat::default()
        };
        let stores = Stores {
            schedule: Arc::new(InMemoryScheduleRepository::new()),
            subscribers: Arc::new(InMemorySubscriberRepository::new()),
        };

        let services = wire_services(
            format.clone(),
            stores,
            Arc::new(FixtureMessageSink),
            Arc::new(FixtureScheduleSource),
            Arc::new(DefaultClock),
        );

        assert_eq!(services.http_state.format, format);
    }
}
