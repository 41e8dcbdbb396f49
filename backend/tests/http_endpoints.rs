//! HTTP guardrails for the inbound adapters over the real domain services.
//!
//! Handlers run inside an in-process Actix service with in-memory stores and
//! a recording sink, so the assertions cover JSON shapes, status codes and
//! the side effects a request leaves behind.

use std::sync::{Arc, Mutex};

use actix_web::http::StatusCode;
use actix_web::{App, test as actix_test, web};
use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use rstest::{fixture, rstest};
use schedule_watch::Trace;
use schedule_watch::domain::ports::{
    FixtureScheduleSource, MessageSink, MessageSinkError, ScheduleRepository,
    SubscriberRepository,
};
use schedule_watch::domain::{
    Notifier, ScheduleExtractor, ScheduleFormat, ScheduleReconciler, ScheduleUpdateService,
    SubscriberId, SubscriptionService,
};
use schedule_watch::inbound::http::schedule::{apply_update, refresh_schedule};
use schedule_watch::inbound::http::json_config;
use schedule_watch::inbound::http::state::HttpState;
use schedule_watch::inbound::http::telegram::receive_message;
use schedule_watch::outbound::memory::{
    InMemoryScheduleRepository, InMemorySubscriberRepository,
};
use serde_json::{Value, json};

#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<(SubscriberId, String)>>,
}

impl RecordingSink {
    fn count_for(&self, chat: i64) -> usize {
        self.sent
            .lock()
            .expect("sink lock")
            .iter()
            .filter(|(id, _)| id.get() == chat)
            .count()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send(&self, recipient: SubscriberId, text: &str) -> Result<(), MessageSinkError> {
        self.sent
            .lock()
            .expect("sink lock")
            .push((recipient, text.to_owned()));
        Ok(())
    }
}

struct Wiring {
    state: web::Data<HttpState>,
    schedule: Arc<InMemoryScheduleRepository>,
    subscribers: Arc<InMemorySubscriberRepository>,
    sink: Arc<RecordingSink>,
}

#[fixture]
fn wiring() -> Wiring {
    let format = ScheduleFormat::default();
    let schedule = Arc::new(InMemoryScheduleRepository::new());
    let subscribers = Arc::new(InMemorySubscriberRepository::new());
    let sink = Arc::new(RecordingSink::default());
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);

    let notifier = Notifier::new(subscribers.clone(), sink.clone(), format.clone());
    let updates = ScheduleUpdateService::new(
        Arc::new(FixtureScheduleSource),
        ScheduleExtractor::new(format.clone()),
        ScheduleReconciler::new(schedule.clone()),
        notifier.clone(),
        clock,
    );
    let subscriptions = SubscriptionService::new(
        subscribers.clone(),
        schedule.clone(),
        sink.clone(),
        notifier,
        format.queue_count,
    );
    Wiring {
        state: web::Data::new(HttpState::new(
            Arc::new(updates),
            Arc::new(subscriptions),
            format,
        )),
        schedule,
        subscribers,
        sink,
    }
}

fn telegram_text(chat: i64, text: &str) -> Value {
    json!({
        "update_id": 1,
        "message": {
            "message_id": 7,
            "from": { "id": chat, "is_bot": false, "first_name": "Test" },
            "chat": { "id": chat, "type": "private" },
            "date": 1_704_866_400,
            "text": text
        }
    })
}

fn update_body(fetched_at: &str, windows: &str) -> Value {
    json!({
        "fetchedAt": fetched_at,
        "queues": [
            { "number": 1, "date": "2024-01-10", "disconnectionTimes": windows },
            { "number": 2, "date": "2024-01-10", "disconnectionTimes": "" }
        ]
    })
}

#[rstest]
#[actix_web::test]
async fn start_then_update_notifies_over_http(wiring: Wiring) {
    let app = actix_test::init_service(
        App::new()
            .app_data(wiring.state.clone())
            .wrap(Trace)
            .service(apply_update)
            .service(receive_message),
    )
    .await;

    let start: Value = actix_test::call_and_read_body_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/message")
            .set_json(telegram_text(42, "/start"))
            .to_request(),
    )
    .await;
    assert_eq!(start["outcome"], "subscribed");
    assert_eq!(wiring.subscribers.load_all().await.expect("load").len(), 1);

    let report: Value = actix_test::call_and_read_body_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/update")
            .set_json(update_body("2024-01-10T06:00:00Z", "08:00-10:00;18:00-20:00"))
            .to_request(),
    )
    .await;
    assert_eq!(report["received"], 1, "queue 2 has no windows");
    assert_eq!(report["reconcile"]["inserted"], 1);
    assert_eq!(report["notification"]["delivered"], 1);
    assert_eq!(wiring.sink.count_for(42), 2, "welcome and one update");

    let records = wiring.schedule.load_all().await.expect("load");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].number.get(), 1);
    assert_eq!(records[0].windows.len(), 2);

    let repeat: Value = actix_test::call_and_read_body_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/update")
            .set_json(update_body("2024-01-10T06:05:00Z", "08:00-10:00;18:00-20:00"))
            .to_request(),
    )
    .await;
    assert_eq!(repeat["reconcile"]["unchanged"], 1);
    assert!(repeat.get("notification").is_none());
    assert_eq!(wiring.sink.count_for(42), 2);
}

#[rstest]
#[case::zero(0)]
#[case::negative(-3)]
#[actix_web::test]
async fn update_rejects_invalid_queue_numbers(wiring: Wiring, #[case] number: i64) {
    let app = actix_test::init_service(
        App::new()
            .app_data(wiring.state.clone())
            .app_data(json_config())
            .wrap(Trace)
            .service(apply_update),
    )
    .await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/update")
            .set_json(json!({
                "fetchedAt": "2024-01-10T06:00:00Z",
                "queues": [{ "number": number, "date": "2024-01-10", "disconnectionTimes": "" }]
            }))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(res.headers().contains_key("trace-id"));
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["code"], "invalid_request");
    assert_eq!(body["details"]["field"], "queues[0].number");
    assert!(wiring.schedule.load_all().await.expect("load").is_empty());
}

#[rstest]
#[actix_web::test]
async fn update_rejects_windows_without_times(wiring: Wiring) {
    let app = actix_test::init_service(
        App::new()
            .app_data(wiring.state.clone())
            .wrap(Trace)
            .service(apply_update),
    )
    .await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/update")
            .set_json(json!({
                "fetchedAt": "2024-01-10T06:00:00Z",
                "queues": [
                    { "number": 1, "date": "2024-01-10", "disconnectionTimes": "08:00-10:00" },
                    { "number": 2, "date": "2024-01-10", "disconnectionTimes": "немає" }
                ]
            }))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["details"]["field"], "queues[1].disconnectionTimes");
    assert!(wiring.schedule.load_all().await.expect("load").is_empty());
}

#[rstest]
#[actix_web::test]
async fn refresh_without_a_table_is_unprocessable(wiring: Wiring) {
    let app = actix_test::init_service(
        App::new()
            .app_data(wiring.state.clone())
            .wrap(Trace)
            .service(refresh_schedule),
    )
    .await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post().uri("/refresh").to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["code"], "unprocessable_schedule");
    assert_eq!(body["details"]["reason"], "no_table_body");
}

#[rstest]
#[actix_web::test]
async fn queue_command_over_http_updates_the_filter(wiring: Wiring) {
    let app = actix_test::init_service(
        App::new()
            .app_data(wiring.state.clone())
            .service(receive_message),
    )
    .await;

    let before: Value = actix_test::call_and_read_body_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/message")
            .set_json(telegram_text(7, "/queue 3"))
            .to_request(),
    )
    .await;
    assert_eq!(before["outcome"], "not_subscribed");

    actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/message")
            .set_json(telegram_text(7, "/start"))
            .to_request(),
    )
    .await;
    let changed: Value = actix_test::call_and_read_body_json(
        &app,
        actix_test::TestRequest::post()
            .uri("/message")
            .set_json(telegram_text(7, "/queue 3"))
            .to_request(),
    )
    .await;

    assert_eq!(changed["outcome"], "filter_changed");
    assert_eq!(changed["queue"], 3);
    let stored = wiring
        .subscribers
        .find(SubscriberId::new(7))
        .await
        .expect("find")
        .expect("registered");
    assert_eq!(stored.queue_filter.map(|q| q.get()), Some(3));
}

#[rstest]
#[actix_web::test]
async fn non_message_updates_are_acknowledged(wiring: Wiring) {
    let app = actix_test::init_service(
        App::new()
            .app_data(wiring.state.clone())
            .service(receive_message),
    )
    .await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/message")
            .set_json(json!({ "update_id": 9, "edited_message": { "text": "/start" } }))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    assert!(wiring.subscribers.load_all().await.expect("load").is_empty());
}

#[rstest]
#[actix_web::test]
async fn malformed_update_bodies_are_bad_requests(wiring: Wiring) {
    let app = actix_test::init_service(
        App::new()
            .app_data(wiring.state.clone())
            .app_data(json_config())
            .wrap(Trace)
            .service(apply_update),
    )
    .await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/update")
            .set_json(json!({ "fetchedAt": "yesterday", "queues": [] }))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(res.headers().contains_key("trace-id"));
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["code"], "invalid_request");
    assert_eq!(body["details"]["reason"], "malformed_json");
}
