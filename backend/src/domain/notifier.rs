//! Per-subscriber change notifications with watermark tracking.
//!
//! For every subscriber the notifier selects the records newer than their
//! watermark that pass their queue filter, sends one rendered message, and
//! remembers the newest delivered `updated_at`. Sends run concurrently and
//! fail independently. Watermarks of successful sends are then committed in
//! one write; a failed send leaves that subscriber's watermark untouched so
//! the same records are offered again later.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tracing::{debug, error, info, warn};

use super::ports::{MessageSink, NotificationSummary, SubscriberRepository};
use super::store_errors::map_subscriber_error;
use super::{
    Error, QueueRecord, ScheduleFormat, SubscriberId, SubscriberRecord, WatermarkAdvance,
    render_update_message,
};

/// What happened for one subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// The message was sent; `watermark` is the newest record included.
    Delivered {
        /// Newest `updated_at` in the message.
        watermark: DateTime<Utc>,
        /// Records listed in the message.
        records: usize,
    },
    /// The sink refused or failed; the watermark stays where it was.
    Failed {
        /// Sink error text.
        reason: String,
    },
    /// No record passed the filter and watermark.
    NothingNew,
}

/// Delivery result for one subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Recipient.
    pub subscriber: SubscriberId,
    /// Result.
    pub status: DeliveryStatus,
}

/// Aggregate result of one notification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyOutcome {
    /// One entry per subscriber considered.
    pub deliveries: Vec<DeliveryReport>,
    /// Whether the watermark write succeeded. `true` when there was nothing
    /// to write.
    pub watermarks_committed: bool,
}

impl NotifyOutcome {
    /// Counts for reporting.
    pub fn summary(&self) -> NotificationSummary {
        let mut summary = NotificationSummary {
            watermarks_committed: self.watermarks_committed,
            ..NotificationSummary::default()
        };
        for delivery in &self.deliveries {
            match delivery.status {
                DeliveryStatus::Delivered { .. } => summary.delivered += 1,
                DeliveryStatus::Failed { .. } => summary.failed += 1,
                DeliveryStatus::NothingNew => summary.skipped += 1,
            }
        }
        summary
    }

    /// Watermarks to persist, one per successful send.
    fn advances(&self) -> Vec<WatermarkAdvance> {
        self.deliveries
            .iter()
            .filter_map(|delivery| match delivery.status {
                DeliveryStatus::Delivered { watermark, .. } => Some(WatermarkAdvance {
                    subscriber_id: delivery.subscriber,
                    watermark,
                }),
                _ => None,
            })
            .collect()
    }
}

/// Records `subscriber` should be sent, ordered by `(date, queue)`.
pub fn select_candidates<'a>(
    subscriber: &SubscriberRecord,
    records: &'a [QueueRecord],
) -> Vec<&'a QueueRecord> {
    let mut candidates: Vec<&QueueRecord> =
        records.iter().filter(|record| subscriber.wants(record)).collect();
    candidates.sort_by_key(|record| record.key());
    candidates
}

/// Domain service fanning change notifications out to subscribers.
#[derive(Clone)]
pub struct Notifier {
    subscribers: Arc<dyn SubscriberRepository>,
    sink: Arc<dyn MessageSink>,
    format: ScheduleFormat,
}

impl Notifier {
    /// Create a notifier.
    pub fn new(
        subscribers: Arc<dyn SubscriberRepository>,
        sink: Arc<dyn MessageSink>,
        format: ScheduleFormat,
    ) -> Self {
        Self {
            subscribers,
            sink,
            format,
        }
    }

    /// Notify every subscriber about the records in `records` they have not
    /// seen yet.
    ///
    /// `records` may be the change set of one cycle or the whole mirror; the
    /// watermark keeps already delivered records out either way. Only a
    /// failure to load subscribers is returned as an error.
    pub async fn notify(
        &self,
        records: &[QueueRecord],
        now: DateTime<Utc>,
    ) -> Result<NotifyOutcome, Error> {
        let subscribers = self
            .subscribers
            .load_all()
            .await
            .map_err(map_subscriber_error)?;
        debug!(subscribers = subscribers.len(), records = records.len(), %now, "notifying subscribers");

        let deliveries = join_all(
            subscribers
                .iter()
                .map(|subscriber| self.dispatch(subscriber, records)),
        )
        .await;

        let outcome = self.commit(deliveries).await;
        let summary = outcome.summary();
        info!(
            delivered = summary.delivered,
            failed = summary.failed,
            skipped = summary.skipped,
            watermarks_committed = summary.watermarks_committed,
            "notification pass finished"
        );
        Ok(outcome)
    }

    /// Notify a single subscriber, committing their watermark on success.
    pub async fn notify_subscriber(
        &self,
        subscriber: &SubscriberRecord,
        records: &[QueueRecord],
    ) -> NotifyOutcome {
        let delivery = self.dispatch(subscriber, records).await;
        self.commit(vec![delivery]).await
    }

    async fn dispatch(&self, subscriber: &SubscriberRecord, records: &[QueueRecord]) -> DeliveryReport {
        let candidates = select_candidates(subscriber, records);
        let Some(watermark) = candidates.iter().map(|record| record.updated_at).max() else {
            return DeliveryReport {
                subscriber: subscriber.id,
                status: DeliveryStatus::NothingNew,
            };
        };

        let text = render_update_message(&candidates, &self.format);
        let status = match self.sink.send(subscriber.id, &text).await {
            Ok(()) => DeliveryStatus::Delivered {
                watermark,
                records: candidates.len(),
            },
            Err(err) => {
                warn!(subscriber = %subscriber.id, error = %err, "schedule update was not delivered");
                DeliveryStatus::Failed {
                    reason: err.to_string(),
                }
            }
        };
        DeliveryReport {
            subscriber: subscriber.id,
            status,
        }
    }

    async fn commit(&self, deliveries: Vec<DeliveryReport>) -> NotifyOutcome {
        let mut outcome = NotifyOutcome {
            deliveries,
            watermarks_committed: true,
        };
        let advances = outcome.advances();
        if advances.is_empty() {
            return outcome;
        }
        if let Err(err) = self.subscribers.commit_watermarks(&advances).await {
            error!(error = %err, advances = advances.len(), "watermark commit failed; deliveries will repeat");
            outcome.watermarks_committed = false;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{
        MessageSinkError, MockMessageSink, MockSubscriberRepository, SubscriberRepositoryError,
    };
    use crate::domain::test_fixtures::{at_minute, record, subscriber};
    use mockall::predicate::eq;
    use rstest::rstest;

    fn notifier(subscribers: MockSubscriberRepository, sink: MockMessageSink) -> Notifier {
        Notifier::new(Arc::new(subscribers), Arc::new(sink), ScheduleFormat::default())
    }

    #[rstest]
    fn candidates_are_filtered_and_sorted() {
        let records = vec![
            record(3, 11, "08:00-10:00", at_minute(10)),
            record(1, 11, "08:00-10:00", at_minute(10)),
            record(1, 10, "08:00-10:00", at_minute(0)),
            record(2, 10, "08:00-10:00", at_minute(10)),
        ];
        let subscriber = subscriber(1, None, Some(at_minute(5)));

        let selected = select_candidates(&subscriber, &records);

        let keys: Vec<_> = selected.iter().map(|r| (r.date, r.number.get())).collect();
        assert_eq!(
            keys,
            vec![
                (records[3].date, 2),
                (records[1].date, 1),
                (records[0].date, 3),
            ]
        );
    }

    #[rstest]
    #[tokio::test]
    async fn delivered_subscriber_watermark_moves_to_newest_record() {
        let records = vec![
            record(1, 10, "08:00-10:00", at_minute(10)),
            record(3, 10, "12:00-14:00", at_minute(10)),
        ];
        let mut subscribers = MockSubscriberRepository::new();
        subscribers
            .expect_load_all()
            .times(1)
            .return_once(|| Ok(vec![subscriber(7, None, Some(at_minute(0)))]));
        subscribers
            .expect_commit_watermarks()
            .withf(|advances| {
                advances
                    == [WatermarkAdvance {
                        subscriber_id: SubscriberId::new(7),
                        watermark: at_minute(10),
                    }]
            })
            .times(1)
            .return_once(|_| Ok(()));
        let mut sink = MockMessageSink::new();
        sink.expect_send()
            .withf(|recipient, text| {
                *recipient == SubscriberId::new(7)
                    && text.contains("Черга №1")
                    && text.find("Черга №1") < text.find("Черга №3")
            })
            .times(1)
            .return_once(|_, _| Ok(()));

        let outcome = notifier(subscribers, sink)
            .notify(&records, at_minute(10))
            .await
            .expect("notify succeeds");

        assert_eq!(outcome.summary().delivered, 1);
        assert!(outcome.watermarks_committed);
    }

    #[rstest]
    #[tokio::test]
    async fn failed_send_keeps_watermark_and_does_not_block_others() {
        let records = vec![record(2, 10, "08:00-10:00", at_minute(10))];
        let mut subscribers = MockSubscriberRepository::new();
        subscribers.expect_load_all().times(1).return_once(|| {
            Ok(vec![
                subscriber(1, None, None),
                subscriber(2, Some(2), Some(at_minute(0))),
            ])
        });
        subscribers
            .expect_commit_watermarks()
            .withf(|advances| {
                advances.len() == 1 && advances[0].subscriber_id == SubscriberId::new(2)
            })
            .times(1)
            .return_once(|_| Ok(()));
        let mut sink = MockMessageSink::new();
        sink.expect_send()
            .with(eq(SubscriberId::new(1)), mockall::predicate::always())
            .times(1)
            .return_once(|_, _| Err(MessageSinkError::rejected("bot was blocked by the user")));
        sink.expect_send()
            .with(eq(SubscriberId::new(2)), mockall::predicate::always())
            .times(1)
            .return_once(|_, _| Ok(()));

        let outcome = notifier(subscribers, sink)
            .notify(&records, at_minute(10))
            .await
            .expect("notify succeeds");

        let summary = outcome.summary();
        assert_eq!((summary.delivered, summary.failed), (1, 1));
    }

    #[rstest]
    #[tokio::test]
    async fn subscribers_with_nothing_new_are_skipped_without_writes() {
        let records = vec![record(2, 10, "08:00-10:00", at_minute(10))];
        let mut subscribers = MockSubscriberRepository::new();
        subscribers.expect_load_all().times(1).return_once(|| {
            Ok(vec![
                subscriber(1, Some(4), None),
                subscriber(2, None, Some(at_minute(10))),
            ])
        });
        subscribers.expect_commit_watermarks().never();
        let mut sink = MockMessageSink::new();
        sink.expect_send().never();

        let outcome = notifier(subscribers, sink)
            .notify(&records, at_minute(10))
            .await
            .expect("notify succeeds");

        assert_eq!(outcome.summary().skipped, 2);
        assert!(outcome.watermarks_committed);
    }

    #[rstest]
    #[tokio::test]
    async fn watermark_commit_failure_is_reported() {
        let records = vec![record(2, 10, "08:00-10:00", at_minute(10))];
        let mut subscribers = MockSubscriberRepository::new();
        subscribers
            .expect_load_all()
            .times(1)
            .return_once(|| Ok(vec![subscriber(1, None, None)]));
        subscribers
            .expect_commit_watermarks()
            .times(1)
            .return_once(|_| Err(SubscriberRepositoryError::query("deadlock detected")));
        let mut sink = MockMessageSink::new();
        sink.expect_send().times(1).return_once(|_, _| Ok(()));

        let outcome = notifier(subscribers, sink)
            .notify(&records, at_minute(10))
            .await
            .expect("notify still reports");

        assert!(!outcome.watermarks_committed);
        assert!(!outcome.summary().watermarks_committed);
    }

    #[rstest]
    #[tokio::test]
    async fn subscriber_load_failure_is_an_error() {
        let mut subscribers = MockSubscriberRepository::new();
        subscribers
            .expect_load_all()
            .times(1)
            .return_once(|| Err(SubscriberRepositoryError::connection("refused")));
        let mut sink = MockMessageSink::new();
        sink.expect_send().never();

        let result = notifier(subscribers, sink).notify(&[], at_minute(0)).await;

        assert!(result.is_err());
    }
}
