//! Subscriber entities.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{QueueNumber, QueueRecord};

/// Messaging-platform chat identifier of a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(i64);

impl SubscriberId {
    /// Wrap a chat identifier.
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Raw chat identifier.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered recipient of schedule updates.
///
/// `last_received_update` is the watermark: the newest record `updated_at`
/// this subscriber has been sent. It only moves forward, and only after a
/// successful send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberRecord {
    /// Chat identifier.
    pub id: SubscriberId,
    /// Queue the subscriber follows; `None` means every queue.
    pub queue_filter: Option<QueueNumber>,
    /// Watermark; `None` until the first successful delivery.
    pub last_received_update: Option<DateTime<Utc>>,
}

impl SubscriberRecord {
    /// A freshly registered subscriber following every queue.
    pub fn new(id: SubscriberId) -> Self {
        Self {
            id,
            queue_filter: None,
            last_received_update: None,
        }
    }

    /// Whether `record` passes the queue filter and is newer than the
    /// watermark.
    ///
    /// # Examples
    /// ```
    /// use chrono::{NaiveDate, TimeZone, Utc};
    /// use schedule_watch::domain::{
    ///     QueueNumber, QueueRecord, SubscriberId, SubscriberRecord, WindowSet,
    /// };
    ///
    /// let record = QueueRecord {
    ///     number: QueueNumber::new(2).expect("queue"),
    ///     date: NaiveDate::from_ymd_opt(2024, 1, 10).expect("date"),
    ///     windows: WindowSet::decode("08:00-10:00", ';'),
    ///     updated_at: Utc.with_ymd_and_hms(2024, 1, 9, 12, 0, 0).unwrap(),
    /// };
    /// let subscriber = SubscriberRecord::new(SubscriberId::new(7));
    /// assert!(subscriber.wants(&record));
    /// ```
    pub fn wants(&self, record: &QueueRecord) -> bool {
        let queue_matches = self
            .queue_filter
            .is_none_or(|queue| queue == record.number);
        let newer = self
            .last_received_update
            .is_none_or(|watermark| record.updated_at > watermark);
        queue_matches && newer
    }
}

/// A watermark to persist for one subscriber after a successful send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkAdvance {
    /// Subscriber whose watermark moves.
    pub subscriber_id: SubscriberId,
    /// Newest `updated_at` included in the delivered message.
    pub watermark: DateTime<Utc>,
}
