//! Driven port for subscriber persistence.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{QueueNumber, SubscriberId, SubscriberRecord, WatermarkAdvance};

define_port_error! {
    /// Errors raised by subscriber store adapters.
    pub enum SubscriberRepositoryError {
        /// The store could not be reached.
        Connection { message: String } =>
            "subscriber store connection failed: {message}",
        /// A read or write failed.
        Query { message: String } =>
            "subscriber store query failed: {message}",
        /// A subscriber with this identifier already exists.
        Duplicate { subscriber_id: i64 } =>
            "subscriber {subscriber_id} is already registered",
    }
}

/// Port for subscriber registration, filters and watermarks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    /// Load every subscriber.
    async fn load_all(&self) -> Result<Vec<SubscriberRecord>, SubscriberRepositoryError>;

    /// Look up one subscriber.
    async fn find(
        &self,
        id: SubscriberId,
    ) -> Result<Option<SubscriberRecord>, SubscriberRepositoryError>;

    /// Register a new subscriber.
    async fn insert(&self, subscriber: &SubscriberRecord) -> Result<(), SubscriberRepositoryError>;

    /// Replace the queue filter. Returns `false` when the subscriber is
    /// unknown.
    async fn set_queue_filter(
        &self,
        id: SubscriberId,
        queue_filter: Option<QueueNumber>,
    ) -> Result<bool, SubscriberRepositoryError>;

    /// Remove a subscriber. Returns `false` when nothing was removed.
    async fn remove(&self, id: SubscriberId) -> Result<bool, SubscriberRepositoryError>;

    /// Persist watermark advances in one atomic write.
    ///
    /// A stored watermark never moves backwards: an advance older than the
    /// stored value leaves it untouched. Advances for subscribers removed in
    /// the meantime are ignored.
    async fn commit_watermarks(
        &self,
        advances: &[WatermarkAdvance],
    ) -> Result<(), SubscriberRepositoryError>;
}

/// Fixture store with no subscribers that accepts every write.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureSubscriberRepository;

#[async_trait]
impl SubscriberRepository for FixtureSubscriberRepository {
    async fn load_all(&self) -> Result<Vec<SubscriberRecord>, SubscriberRepositoryError> {
        Ok(Vec::new())
    }

    async fn find(
        &self,
        _id: SubscriberId,
    ) -> Result<Option<SubscriberRecord>, SubscriberRepositoryError> {
        Ok(None)
    }

    async fn insert(&self, _subscriber: &SubscriberRecord) -> Result<(), SubscriberRepositoryError> {
        Ok(())
    }

    async fn set_queue_filter(
        &self,
        _id: SubscriberId,
        _queue_filter: Option<QueueNumber>,
    ) -> Result<bool, SubscriberRepositoryError> {
        Ok(false)
    }

    async fn remove(&self, _id: SubscriberId) -> Result<bool, SubscriberRepositoryError> {
        Ok(false)
    }

    async fn commit_watermarks(
        &self,
        _advances: &[WatermarkAdvance],
    ) -> Result<(), SubscriberRepositoryError> {
        Ok(())
    }
}
