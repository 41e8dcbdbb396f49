//! Reconciles an incoming schedule against the stored mirror.
//!
//! Planning is pure: given the current records and the incoming entries it
//! produces one [`ScheduleBatch`]. The service then commits that batch
//! atomically and reports both the changed records and the resulting mirror.
//!
//! A record's `updated_at` only moves when its windows change. Every write of
//! one cycle carries the same stamp, and that stamp is always later than any
//! stamp already stored so watermarks keep working when snapshots arrive
//! with an older `fetched_at`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::ports::{ReconcileSummary, ScheduleBatch, ScheduleRepository};
use super::store_errors::map_schedule_error;
use super::{Error, QueueKey, QueueRecord, QueueSchedule};

/// Stored timestamps keep microsecond precision.
const STAMP_PRECISION: u16 = 6;

/// Pure result of comparing incoming entries with the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Writes to commit.
    pub batch: ScheduleBatch,
    /// Counts describing the batch.
    pub summary: ReconcileSummary,
    /// Stamp carried by every insert and update.
    pub stamp: DateTime<Utc>,
}

/// Result of a committed reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Counts describing what was written.
    pub summary: ReconcileSummary,
    /// Inserted and updated records ordered by `(date, queue)`.
    pub changed: Vec<QueueRecord>,
    /// Every record in the store after the commit, ordered by `(date, queue)`.
    pub records: Vec<QueueRecord>,
}

/// Compare `incoming` with `current` and plan the writes.
///
/// When `incoming` repeats a key, the first occurrence wins.
pub fn plan_reconciliation(
    current: &[QueueRecord],
    incoming: Vec<QueueSchedule>,
    now: DateTime<Utc>,
) -> ReconcilePlan {
    let stored: BTreeMap<QueueKey, &QueueRecord> =
        current.iter().map(|record| (record.key(), record)).collect();
    let stamp = cycle_stamp(current, now);

    let mut batch = ScheduleBatch::default();
    let mut summary = ReconcileSummary::default();
    let mut seen = BTreeSet::new();
    for entry in incoming {
        let key = entry.key();
        if !seen.insert(key) {
            warn!(%key, "duplicate schedule entry ignored");
            summary.duplicates += 1;
            continue;
        }
        let next = QueueRecord {
            number: entry.number,
            date: entry.date,
            windows: entry.windows,
            updated_at: stamp,
        };
        match stored.get(&key) {
            None => batch.inserts.push(next),
            Some(existing) if existing.windows == next.windows => summary.unchanged += 1,
            Some(_) => batch.updates.push(next),
        }
    }
    batch.deletes = stored.keys().filter(|key| !seen.contains(*key)).copied().collect();

    batch.inserts.sort_by_key(QueueRecord::key);
    batch.updates.sort_by_key(QueueRecord::key);
    summary.inserted = batch.inserts.len();
    summary.updated = batch.updates.len();
    summary.deleted = batch.deletes.len();

    ReconcilePlan {
        batch,
        summary,
        stamp,
    }
}

fn cycle_stamp(current: &[QueueRecord], now: DateTime<Utc>) -> DateTime<Utc> {
    let now = now.trunc_subsecs(STAMP_PRECISION);
    match current.iter().map(|record| record.updated_at).max() {
        Some(newest) if newest >= now => {
            let bumped = newest + Duration::microseconds(1);
            warn!(%now, %newest, stamp = %bumped, "snapshot is not newer than stored data; bumping stamp");
            bumped
        }
        _ => now,
    }
}

/// Domain service committing reconciliations to a [`ScheduleRepository`].
///
/// Clones share one lock, so load, diff and commit never interleave between
/// overlapping cycles.
#[derive(Clone)]
pub struct ScheduleReconciler {
    repository: Arc<dyn ScheduleRepository>,
    guard: Arc<Mutex<()>>,
}

impl ScheduleReconciler {
    /// Create a reconciler over `repository`.
    pub fn new(repository: Arc<dyn ScheduleRepository>) -> Self {
        Self {
            repository,
            guard: Arc::new(Mutex::new(())),
        }
    }

    /// Make the store mirror `incoming` and report what changed.
    ///
    /// The batch is skipped entirely when nothing differs. On a store error
    /// nothing is written and nobody should be notified.
    pub async fn reconcile(
        &self,
        incoming: Vec<QueueSchedule>,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, Error> {
        let _guard = self.guard.lock().await;
        let current = self.repository.load_all().await.map_err(map_schedule_error)?;
        let plan = plan_reconciliation(&current, incoming, now);

        if !plan.batch.is_empty() {
            self.repository
                .apply_batch(&plan.batch)
                .await
                .map_err(map_schedule_error)?;
        }
        info!(
            inserted = plan.summary.inserted,
            updated = plan.summary.updated,
            deleted = plan.summary.deleted,
            unchanged = plan.summary.unchanged,
            duplicates = plan.summary.duplicates,
            stamp = %plan.stamp,
            "schedule reconciled"
        );

        let mut mirror: BTreeMap<QueueKey, QueueRecord> = current
            .into_iter()
            .map(|record| (record.key(), record))
            .collect();
        for key in &plan.batch.deletes {
            mirror.remove(key);
        }
        let ScheduleBatch {
            mut inserts,
            updates,
            ..
        } = plan.batch;
        inserts.extend(updates);
        inserts.sort_by_key(QueueRecord::key);
        mirror.extend(inserts.iter().map(|record| (record.key(), record.clone())));

        Ok(ReconcileOutcome {
            summary: plan.summary,
            changed: inserts,
            records: mirror.into_values().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{MockScheduleRepository, ScheduleRepositoryError};
    use crate::domain::test_fixtures::{at_minute, day, queue, record, schedule};
    use rstest::rstest;

    #[rstest]
    fn empty_store_inserts_everything() {
        let plan = plan_reconciliation(
            &[],
            vec![schedule(2, 10, "08:00-10:00"), schedule(1, 10, "12:00-14:00")],
            at_minute(0),
        );

        assert_eq!(plan.summary.inserted, 2);
        assert!(plan.batch.updates.is_empty());
        assert!(plan.batch.deletes.is_empty());
        assert_eq!(plan.batch.inserts[0].number, queue(1));
        assert!(plan.batch.inserts.iter().all(|r| r.updated_at == at_minute(0)));
    }

    #[rstest]
    fn identical_windows_keep_their_stamp() {
        let current = vec![record(1, 10, "08:00-10:00", at_minute(0))];

        let plan = plan_reconciliation(&current, vec![schedule(1, 10, "08:00-10:00")], at_minute(30));

        assert!(plan.batch.is_empty());
        assert_eq!(plan.summary.unchanged, 1);
        assert!(!plan.summary.has_changes());
    }

    #[rstest]
    fn changed_windows_are_updated_and_missing_keys_deleted() {
        let current = vec![
            record(1, 10, "08:00-10:00", at_minute(0)),
            record(2, 10, "10:00-12:00", at_minute(0)),
        ];

        let plan = plan_reconciliation(
            &current,
            vec![schedule(1, 10, "08:00-10:00;18:00-20:00"), schedule(3, 11, "09:00-11:00")],
            at_minute(30),
        );

        assert_eq!(plan.batch.updates, vec![record(1, 10, "08:00-10:00;18:00-20:00", at_minute(30))]);
        assert_eq!(plan.batch.inserts, vec![record(3, 11, "09:00-11:00", at_minute(30))]);
        assert_eq!(plan.batch.deletes, vec![QueueKey::new(queue(2), day(10))]);
    }

    #[rstest]
    fn reordered_windows_count_as_a_change() {
        let current = vec![record(1, 10, "08:00-10:00;18:00-20:00", at_minute(0))];

        let plan = plan_reconciliation(
            &current,
            vec![schedule(1, 10, "18:00-20:00;08:00-10:00")],
            at_minute(30),
        );

        assert_eq!(plan.summary.updated, 1);
    }

    #[rstest]
    fn first_duplicate_wins() {
        let plan = plan_reconciliation(
            &[],
            vec![schedule(1, 10, "08:00-10:00"), schedule(1, 10, "20:00-22:00")],
            at_minute(0),
        );

        assert_eq!(plan.summary.duplicates, 1);
        assert_eq!(plan.batch.inserts, vec![record(1, 10, "08:00-10:00", at_minute(0))]);
    }

    #[rstest]
    fn empty_snapshot_deletes_everything() {
        let current = vec![
            record(1, 10, "08:00-10:00", at_minute(0)),
            record(1, 11, "08:00-10:00", at_minute(0)),
        ];

        let plan = plan_reconciliation(&current, Vec::new(), at_minute(30));

        assert_eq!(plan.summary.deleted, 2);
        assert!(plan.summary.has_changes());
    }

    #[rstest]
    fn stale_snapshot_gets_a_stamp_after_stored_data() {
        let current = vec![record(1, 10, "08:00-10:00", at_minute(30))];

        let plan = plan_reconciliation(&current, vec![schedule(1, 10, "09:00-11:00")], at_minute(10));

        assert!(plan.stamp > at_minute(30));
        assert_eq!(plan.batch.updates[0].updated_at, plan.stamp);
    }

    #[rstest]
    fn stamp_is_truncated_to_microseconds() {
        let now = at_minute(0) + Duration::nanoseconds(1_500);

        let plan = plan_reconciliation(&[], vec![schedule(1, 10, "08:00-10:00")], now);

        assert_eq!(plan.stamp, at_minute(0) + Duration::microseconds(1));
    }

    #[rstest]
    #[tokio::test]
    async fn reconcile_commits_one_batch_and_returns_changes_in_order() {
        let mut repo = MockScheduleRepository::new();
        repo.expect_load_all()
            .times(1)
            .return_once(|| Ok(vec![record(1, 10, "08:00-10:00", at_minute(0))]));
        repo.expect_apply_batch()
            .withf(|batch| batch.inserts.len() == 1 && batch.updates.len() == 1)
            .times(1)
            .return_once(|_| Ok(()));
        let reconciler = ScheduleReconciler::new(Arc::new(repo));

        let outcome = reconciler
            .reconcile(
                vec![schedule(4, 11, "09:00-11:00"), schedule(1, 10, "10:00-12:00")],
                at_minute(30),
            )
            .await
            .expect("reconcile succeeds");

        let keys: Vec<_> = outcome.changed.iter().map(QueueRecord::key).collect();
        assert_eq!(
            keys,
            vec![QueueKey::new(queue(1), day(10)), QueueKey::new(queue(4), day(11))]
        );
        assert_eq!(outcome.records, outcome.changed);
    }

    #[rstest]
    #[tokio::test]
    async fn reconcile_skips_commit_when_nothing_changed() {
        let mut repo = MockScheduleRepository::new();
        repo.expect_load_all()
            .times(1)
            .return_once(|| Ok(vec![record(1, 10, "08:00-10:00", at_minute(0))]));
        repo.expect_apply_batch().never();
        let reconciler = ScheduleReconciler::new(Arc::new(repo));

        let outcome = reconciler
            .reconcile(vec![schedule(1, 10, "08:00-10:00")], at_minute(30))
            .await
            .expect("reconcile succeeds");

        assert!(outcome.changed.is_empty());
        assert_eq!(outcome.summary.unchanged, 1);
        assert_eq!(outcome.records, vec![record(1, 10, "08:00-10:00", at_minute(0))]);
    }

    #[rstest]
    #[tokio::test]
    async fn commit_failure_surfaces_as_service_error() {
        let mut repo = MockScheduleRepository::new();
        repo.expect_load_all().times(1).return_once(|| Ok(Vec::new()));
        repo.expect_apply_batch()
            .times(1)
            .return_once(|_| Err(ScheduleRepositoryError::connection("pool timed out")));
        let reconciler = ScheduleReconciler::new(Arc::new(repo));

        let error = reconciler
            .reconcile(vec![schedule(1, 10, "08:00-10:00")], at_minute(0))
            .await
            .expect_err("commit fails");

        assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
    }
}
