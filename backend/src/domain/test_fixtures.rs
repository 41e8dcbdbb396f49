//! Builders shared by domain unit tests.

use std::sync::Arc;

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use mockable::Clock;

use super::{
    QueueNumber, QueueRecord, QueueSchedule, SubscriberId, SubscriberRecord, WindowSet,
};

pub(crate) fn fixture_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 10, 6, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

/// `fixture_timestamp` shifted by whole minutes.
pub(crate) fn at_minute(minutes: i64) -> DateTime<Utc> {
    fixture_timestamp() + Duration::minutes(minutes)
}

pub(crate) fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).expect("valid fixture date")
}

pub(crate) fn queue(n: i64) -> QueueNumber {
    QueueNumber::new(n).expect("valid fixture queue")
}

pub(crate) fn schedule(n: i64, d: u32, windows: &str) -> QueueSchedule {
    QueueSchedule {
        number: queue(n),
        date: day(d),
        windows: WindowSet::decode(windows, ';'),
    }
}

pub(crate) fn record(n: i64, d: u32, windows: &str, updated_at: DateTime<Utc>) -> QueueRecord {
    QueueRecord {
        number: queue(n),
        date: day(d),
        windows: WindowSet::decode(windows, ';'),
        updated_at,
    }
}

pub(crate) fn subscriber(
    id: i64,
    filter: Option<i64>,
    watermark: Option<DateTime<Utc>>,
) -> SubscriberRecord {
    SubscriberRecord {
        id: SubscriberId::new(id),
        queue_filter: filter.map(queue),
        last_received_update: watermark,
    }
}

struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

pub(crate) fn fixture_clock(utc_now: DateTime<Utc>) -> Arc<dyn Clock> {
    Arc::new(FixtureClock { utc_now })
}
