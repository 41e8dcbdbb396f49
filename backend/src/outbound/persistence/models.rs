//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;

use super::schema::{queue_schedules, subscribers};

/// Row struct for reading from the queue_schedules table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = queue_schedules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct QueueScheduleRow {
    pub queue_number: i32,
    pub schedule_date: NaiveDate,
    pub disconnection_times: String,
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for new schedule entries.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = queue_schedules)]
pub(crate) struct NewQueueScheduleRow {
    pub queue_number: i32,
    pub schedule_date: NaiveDate,
    pub disconnection_times: String,
    pub updated_at: DateTime<Utc>,
}

/// Changeset applied when an entry's windows change.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = queue_schedules)]
pub(crate) struct QueueScheduleUpdate<'a> {
    pub disconnection_times: &'a str,
    pub updated_at: DateTime<Utc>,
}

/// Row struct for reading from the subscribers table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = subscribers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SubscriberRow {
    pub chat_id: i64,
    pub queue_filter: Option<i32>,
    pub last_received_update: Option<DateTime<Utc>>,
}

/// Insertable struct for new subscribers.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = subscribers)]
pub(crate) struct NewSubscriberRow {
    pub chat_id: i64,
    pub queue_filter: Option<i32>,
    pub last_received_update: Option<DateTime<Utc>>,
}
