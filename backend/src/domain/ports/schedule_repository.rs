//! Driven port for the mirrored schedule store.
//!
//! Reconciliation reads the full current set once and then applies every
//! insert, update and delete of a cycle as one atomic batch.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{QueueKey, QueueRecord};

/// Writes produced by one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleBatch {
    /// Records absent from the store.
    pub inserts: Vec<QueueRecord>,
    /// Records whose windows changed; `updated_at` carries the new stamp.
    pub updates: Vec<QueueRecord>,
    /// Keys no longer present in the published schedule.
    pub deletes: Vec<QueueKey>,
}

impl ScheduleBatch {
    /// True when the batch would not touch the store.
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

define_port_error! {
    /// Errors raised by schedule store adapters.
    pub enum ScheduleRepositoryError {
        /// The store could not be reached.
        Connection { message: String } =>
            "schedule store connection failed: {message}",
        /// A read or write failed; batches are rolled back on this error.
        Query { message: String } =>
            "schedule store query failed: {message}",
    }
}

/// Port for reading and atomically rewriting the schedule mirror.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Load every stored record.
    async fn load_all(&self) -> Result<Vec<QueueRecord>, ScheduleRepositoryError>;

    /// Apply all writes of `batch` or none of them.
    async fn apply_batch(&self, batch: &ScheduleBatch) -> Result<(), ScheduleRepositoryError>;
}

/// Fixture store that is always empty and accepts every batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureScheduleRepository;

#[async_trait]
impl ScheduleRepository for FixtureScheduleRepository {
    async fn load_all(&self) -> Result<Vec<QueueRecord>, ScheduleRepositoryError> {
        Ok(Vec::new())
    }

    async fn apply_batch(&self, _batch: &ScheduleBatch) -> Result<(), ScheduleRepositoryError> {
        Ok(())
    }
}
