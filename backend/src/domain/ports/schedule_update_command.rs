//! Driving port for running one schedule update cycle.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Error, ScheduleSnapshot};

/// Counts produced by reconciling one snapshot against the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    /// Records created.
    pub inserted: usize,
    /// Records whose windows changed.
    pub updated: usize,
    /// Records removed from the store.
    pub deleted: usize,
    /// Incoming entries identical to the stored ones.
    pub unchanged: usize,
    /// Incoming entries dropped because their key appeared earlier.
    pub duplicates: usize,
}

impl ReconcileSummary {
    /// True when the store was written.
    pub fn has_changes(&self) -> bool {
        self.inserted + self.updated + self.deleted > 0
    }
}

/// Counts produced by notifying subscribers about a change set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSummary {
    /// Subscribers that received a message.
    pub delivered: usize,
    /// Subscribers whose send failed; their watermarks did not move.
    pub failed: usize,
    /// Subscribers with nothing new after filtering.
    pub skipped: usize,
    /// Whether delivered watermarks were persisted.
    pub watermarks_committed: bool,
}

/// Outcome of one update cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCycleReport {
    /// Fetch time of the processed snapshot.
    pub fetched_at: DateTime<Utc>,
    /// Number of entries the snapshot carried.
    pub received: usize,
    /// Store changes.
    pub reconcile: ReconcileSummary,
    /// Notification results; absent when nothing changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationSummary>,
}

/// Driving port for schedule updates.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScheduleUpdateCommand: Send + Sync {
    /// Reconcile a pushed snapshot and notify subscribers of changes.
    async fn apply_snapshot(&self, snapshot: ScheduleSnapshot) -> Result<UpdateCycleReport, Error>;

    /// Fetch the page, extract a snapshot and apply it.
    async fn refresh_from_source(&self) -> Result<UpdateCycleReport, Error>;
}

/// Fixture command that reports an empty cycle without touching anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureScheduleUpdateCommand;

#[async_trait]
impl ScheduleUpdateCommand for FixtureScheduleUpdateCommand {
    async fn apply_snapshot(&self, snapshot: ScheduleSnapshot) -> Result<UpdateCycleReport, Error> {
        Ok(UpdateCycleReport {
            fetched_at: snapshot.fetched_at,
            received: snapshot.queues.len(),
            reconcile: ReconcileSummary::default(),
            notification: None,
        })
    }

    async fn refresh_from_source(&self) -> Result<UpdateCycleReport, Error> {
        Err(Error::service_unavailable("no schedule source configured"))
    }
}
