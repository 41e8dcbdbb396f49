//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ScheduleFormat;
use crate::domain::ports::{ScheduleUpdateCommand, SubscriptionCommand};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub updates: Arc<dyn ScheduleUpdateCommand>,
    pub subscriptions: Arc<dyn SubscriptionCommand>,
    /// Used to decode separator-joined windows in ingestion payloads.
    pub format: ScheduleFormat,
}

impl HttpState {
    /// Construct state from the driving ports.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use schedule_watch::domain::ScheduleFormat;
    /// use schedule_watch::domain::ports::{
    ///     FixtureScheduleUpdateCommand, FixtureSubscriptionCommand,
    /// };
    /// use schedule_watch::inbound::http::state::HttpState;
    ///
    /// let state = HttpState::new(
    ///     Arc::new(FixtureScheduleUpdateCommand),
    ///     Arc::new(FixtureSubscriptionCommand),
    ///     ScheduleFormat::default(),
    /// );
    /// assert_eq!(state.format.separator, ';');
    /// ```
    pub fn new(
        updates: Arc<dyn ScheduleUpdateCommand>,
        subscriptions: Arc<dyn SubscriptionCommand>,
        format: ScheduleFormat,
    ) -> Self {
        Self {
            updates,
            subscriptions,
            format,
        }
    }
}
