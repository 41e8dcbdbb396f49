//! One schedule update cycle: extract, reconcile, notify.
//!
//! Extraction and reconciliation fail closed: any error aborts the cycle
//! before the store is touched or after a rolled-back batch. Notification
//! runs only once the batch is committed and never fails the cycle.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde_json::json;
use tracing::{error, info};

use super::ports::{ScheduleSource, ScheduleSourceError, ScheduleUpdateCommand, UpdateCycleReport};
use super::{
    Error, ExtractionError, Notifier, ScheduleExtractor, ScheduleReconciler, ScheduleSnapshot,
};

/// Fetch the page through `source` and extract a snapshot stamped
/// `fetched_at`.
pub async fn fetch_snapshot(
    source: &dyn ScheduleSource,
    extractor: &ScheduleExtractor,
    fetched_at: DateTime<Utc>,
) -> Result<ScheduleSnapshot, Error> {
    let table = source.fetch_table().await.map_err(map_source_error)?;
    let queues = extractor.extract(&table).map_err(map_extraction_error)?;
    Ok(ScheduleSnapshot { fetched_at, queues })
}

/// Domain service implementing [`ScheduleUpdateCommand`].
#[derive(Clone)]
pub struct ScheduleUpdateService {
    source: Arc<dyn ScheduleSource>,
    extractor: ScheduleExtractor,
    reconciler: ScheduleReconciler,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
}

impl ScheduleUpdateService {
    /// Create the service.
    pub fn new(
        source: Arc<dyn ScheduleSource>,
        extractor: ScheduleExtractor,
        reconciler: ScheduleReconciler,
        notifier: Notifier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            extractor,
            reconciler,
            notifier,
            clock,
        }
    }
}

#[async_trait]
impl ScheduleUpdateCommand for ScheduleUpdateService {
    async fn apply_snapshot(&self, snapshot: ScheduleSnapshot) -> Result<UpdateCycleReport, Error> {
        let ScheduleSnapshot { fetched_at, queues } = snapshot;
        let received = queues.len();

        let outcome = self.reconciler.reconcile(queues, fetched_at).await?;

        let notification = if outcome.summary.has_changes() {
            match self.notifier.notify(&outcome.records, fetched_at).await {
                Ok(result) => Some(result.summary()),
                Err(err) => {
                    error!(error = %err, "subscribers were not notified; changes stay pending");
                    None
                }
            }
        } else {
            None
        };

        info!(%fetched_at, received, changed = outcome.changed.len(), "update cycle finished");
        Ok(UpdateCycleReport {
            fetched_at,
            received,
            reconcile: outcome.summary,
            notification,
        })
    }

    async fn refresh_from_source(&self) -> Result<UpdateCycleReport, Error> {
        let snapshot =
            fetch_snapshot(self.source.as_ref(), &self.extractor, self.clock.utc()).await?;
        self.apply_snapshot(snapshot).await
    }
}

fn map_source_error(error: ScheduleSourceError) -> Error {
    match error {
        ScheduleSourceError::Fetch { message } => {
            Error::service_unavailable(format!("schedule page unavailable: {message}"))
        }
        ScheduleSourceError::Decode { message } => {
            Error::unprocessable_schedule(format!("schedule page unreadable: {message}"))
        }
    }
}

fn map_extraction_error(error: ExtractionError) -> Error {
    let details = match &error {
        ExtractionError::NoTableBody => json!({ "reason": "no_table_body" }),
        ExtractionError::NoDataRows { skipped_rows } => {
            json!({ "reason": "no_data_rows", "skippedRows": skipped_rows })
        }
        ExtractionError::UnparseableDate { row, value } => {
            json!({ "reason": "unparseable_date", "row": row, "value": value })
        }
    };
    Error::unprocessable_schedule(error.to_string()).with_details(details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::RawScheduleTable;
    use crate::domain::ScheduleFormat;
    use crate::domain::ports::{
        MockMessageSink, MockScheduleRepository, MockScheduleSource, MockSubscriberRepository,
        ScheduleRepositoryError,
    };
    use crate::domain::test_fixtures::{at_minute, fixture_clock, record, schedule, subscriber};
    use rstest::rstest;

    struct Doubles {
        source: MockScheduleSource,
        schedule: MockScheduleRepository,
        subscribers: MockSubscriberRepository,
        sink: MockMessageSink,
    }

    impl Doubles {
        fn new() -> Self {
            Self {
                source: MockScheduleSource::new(),
                schedule: MockScheduleRepository::new(),
                subscribers: MockSubscriberRepository::new(),
                sink: MockMessageSink::new(),
            }
        }

        fn into_service(self) -> ScheduleUpdateService {
            let format = ScheduleFormat::default();
            ScheduleUpdateService::new(
                Arc::new(self.source),
                ScheduleExtractor::new(format.clone()),
                ScheduleReconciler::new(Arc::new(self.schedule)),
                Notifier::new(Arc::new(self.subscribers), Arc::new(self.sink), format),
                fixture_clock(at_minute(60)),
            )
        }
    }

    #[rstest]
    #[tokio::test]
    async fn changed_snapshot_is_committed_and_notified() {
        let mut doubles = Doubles::new();
        doubles.schedule.expect_load_all().times(1).return_once(|| Ok(Vec::new()));
        doubles.schedule.expect_apply_batch().times(1).return_once(|_| Ok(()));
        doubles
            .subscribers
            .expect_load_all()
            .times(1)
            .return_once(|| Ok(vec![subscriber(1, None, None)]));
        doubles
            .subscribers
            .expect_commit_watermarks()
            .times(1)
            .return_once(|_| Ok(()));
        doubles.sink.expect_send().times(1).return_once(|_, _| Ok(()));

        let report = doubles
            .into_service()
            .apply_snapshot(ScheduleSnapshot {
                fetched_at: at_minute(30),
                queues: vec![schedule(1, 10, "08:00-10:00;18:00-20:00")],
            })
            .await
            .expect("cycle succeeds");

        assert_eq!(report.reconcile.inserted, 1);
        assert_eq!(report.notification.map(|n| n.delivered), Some(1));
    }

    #[rstest]
    #[tokio::test]
    async fn unchanged_snapshot_skips_notification() {
        let mut doubles = Doubles::new();
        doubles
            .schedule
            .expect_load_all()
            .times(1)
            .return_once(|| Ok(vec![record(1, 10, "08:00-10:00", at_minute(0))]));
        doubles.schedule.expect_apply_batch().never();
        doubles.subscribers.expect_load_all().never();

        let report = doubles
            .into_service()
            .apply_snapshot(ScheduleSnapshot {
                fetched_at: at_minute(30),
                queues: vec![schedule(1, 10, "08:00-10:00")],
            })
            .await
            .expect("cycle succeeds");

        assert!(!report.reconcile.has_changes());
        assert!(report.notification.is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn failed_commit_aborts_before_notification() {
        let mut doubles = Doubles::new();
        doubles.schedule.expect_load_all().times(1).return_once(|| Ok(Vec::new()));
        doubles
            .schedule
            .expect_apply_batch()
            .times(1)
            .return_once(|_| Err(ScheduleRepositoryError::query("unique violation")));
        doubles.subscribers.expect_load_all().never();
        doubles.sink.expect_send().never();

        let result = doubles
            .into_service()
            .apply_snapshot(ScheduleSnapshot {
                fetched_at: at_minute(30),
                queues: vec![schedule(1, 10, "08:00-10:00")],
            })
            .await;

        assert!(result.is_err());
    }

    #[rstest]
    #[tokio::test]
    async fn refresh_stamps_snapshot_with_clock() {
        let mut doubles = Doubles::new();
        doubles.source.expect_fetch_table().times(1).return_once(|| {
            Ok(RawScheduleTable::with_rows(vec![vec![
                "10.01.2024".to_owned(),
                "08:00-10:00".to_owned(),
            ]]))
        });
        doubles.schedule.expect_load_all().times(1).return_once(|| Ok(Vec::new()));
        doubles
            .schedule
            .expect_apply_batch()
            .withf(|batch| batch.inserts.iter().all(|r| r.updated_at == at_minute(60)))
            .times(1)
            .return_once(|_| Ok(()));
        doubles.subscribers.expect_load_all().times(1).return_once(|| Ok(Vec::new()));

        let report = doubles
            .into_service()
            .refresh_from_source()
            .await
            .expect("refresh succeeds");

        assert_eq!(report.fetched_at, at_minute(60));
        assert_eq!(report.received, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn header_only_table_leaves_store_untouched() {
        let mut doubles = Doubles::new();
        doubles.source.expect_fetch_table().times(1).return_once(|| {
            Ok(RawScheduleTable::with_rows(vec![vec![
                "Дата".to_owned(),
                "Черга 1".to_owned(),
            ]]))
        });
        doubles.schedule.expect_load_all().never();
        doubles.schedule.expect_apply_batch().never();

        let error = doubles
            .into_service()
            .refresh_from_source()
            .await
            .expect_err("no data rows");

        assert_eq!(error.code(), ErrorCode::UnprocessableSchedule);
        assert_eq!(
            error.details().and_then(|d| d.get("reason")).and_then(|r| r.as_str()),
            Some("no_data_rows")
        );
    }

    #[rstest]
    #[tokio::test]
    async fn unreachable_page_is_service_unavailable() {
        let mut doubles = Doubles::new();
        doubles
            .source
            .expect_fetch_table()
            .times(1)
            .return_once(|| Err(ScheduleSourceError::fetch("connection reset")));

        let error = doubles
            .into_service()
            .refresh_from_source()
            .await
            .expect_err("fetch fails");

        assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
    }
}
