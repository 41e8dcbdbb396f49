use super::*;
use crate::domain::{ScheduleSnapshot, SubscriberId, SubscriberRecord};
use chrono::{TimeZone, Utc};
use rstest::rstest;

#[rstest]
#[tokio::test]
async fn fixture_schedule_repository_is_empty_and_accepts_batches() {
    let repo = FixtureScheduleRepository;
    assert!(repo.load_all().await.expect("load succeeds").is_empty());
    repo.apply_batch(&ScheduleBatch::default())
        .await
        .expect("apply succeeds");
}

#[rstest]
#[tokio::test]
async fn fixture_subscriber_repository_knows_nobody() {
    let repo = FixtureSubscriberRepository;
    let id = SubscriberId::new(5);
    repo.insert(&SubscriberRecord::new(id))
        .await
        .expect("insert succeeds");
    assert!(repo.find(id).await.expect("find succeeds").is_none());
    assert!(!repo.remove(id).await.expect("remove succeeds"));
    assert!(!repo.set_queue_filter(id, None).await.expect("update succeeds"));
}

#[rstest]
#[tokio::test]
async fn fixture_update_command_echoes_snapshot_size() {
    let fetched_at = Utc
        .with_ymd_and_hms(2024, 1, 10, 6, 0, 0)
        .single()
        .expect("timestamp");
    let report = FixtureScheduleUpdateCommand
        .apply_snapshot(ScheduleSnapshot {
            fetched_at,
            queues: Vec::new(),
        })
        .await
        .expect("fixture applies");
    assert_eq!(report.fetched_at, fetched_at);
    assert_eq!(report.received, 0);
    assert!(!report.reconcile.has_changes());
}

#[rstest]
#[tokio::test]
async fn fixture_subscription_command_rejects_everything() {
    let outcome = FixtureSubscriptionCommand
        .handle_message(IncomingMessage {
            sender: SubscriberId::new(1),
            text: "/start".to_owned(),
        })
        .await
        .expect("fixture handles");
    assert_eq!(outcome, CommandOutcome::Unsupported);
}

#[rstest]
fn port_errors_render_context() {
    assert_eq!(
        SubscriberRepositoryError::duplicate(42_i64).to_string(),
        "subscriber 42 is already registered"
    );
    assert_eq!(
        MessageSinkError::rejected("chat not found").to_string(),
        "message was rejected: chat not found"
    );
}
