//! PostgreSQL-backed `ScheduleRepository`.
//!
//! Windows are stored as one separator-joined `TEXT` column. Every batch runs
//! in a single transaction; any failed statement rolls the whole batch back.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, RunQueryDsl};

use crate::domain::ports::{ScheduleBatch, ScheduleRepository, ScheduleRepositoryError};
use crate::domain::{QueueRecord, WindowSet};

use super::diesel_helpers::{
    map_diesel_error_message, map_pool_error_message, queue_number_from_db, queue_number_to_db,
};
use super::models::{NewQueueScheduleRow, QueueScheduleRow, QueueScheduleUpdate};
use super::pool::{DbPool, PoolError};
use super::schema::queue_schedules;

/// Diesel-backed implementation of the schedule store.
#[derive(Clone)]
pub struct DieselScheduleRepository {
    pool: DbPool,
    separator: char,
}

impl DieselScheduleRepository {
    /// Create a repository encoding windows with `separator`.
    pub fn new(pool: DbPool, separator: char) -> Self {
        Self { pool, separator }
    }
}

fn map_pool_error(error: PoolError) -> ScheduleRepositoryError {
    ScheduleRepositoryError::connection(map_pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> ScheduleRepositoryError {
    ScheduleRepositoryError::query(map_diesel_error_message(error, "schedule batch"))
}

fn row_to_record(row: QueueScheduleRow, separator: char) -> Result<QueueRecord, ScheduleRepositoryError> {
    let number = queue_number_from_db(row.queue_number).ok_or_else(|| {
        ScheduleRepositoryError::query(format!(
            "stored queue number {} is not positive",
            row.queue_number
        ))
    })?;
    Ok(QueueRecord {
        number,
        date: row.schedule_date,
        windows: WindowSet::decode(&row.disconnection_times, separator),
        updated_at: row.updated_at,
    })
}

fn column_queue(record: &QueueRecord) -> Result<i32, ScheduleRepositoryError> {
    queue_number_to_db(record.number).ok_or_else(|| {
        ScheduleRepositoryError::query(format!("queue number {} exceeds column range", record.number))
    })
}

struct PreparedBatch {
    inserts: Vec<NewQueueScheduleRow>,
    updates: Vec<(i32, chrono::NaiveDate, String, chrono::DateTime<chrono::Utc>)>,
    deletes: Vec<(i32, chrono::NaiveDate)>,
}

fn prepare_batch(batch: &ScheduleBatch, separator: char) -> Result<PreparedBatch, ScheduleRepositoryError> {
    let inserts = batch
        .inserts
        .iter()
        .map(|record| {
            Ok(NewQueueScheduleRow {
                queue_number: column_queue(record)?,
                schedule_date: record.date,
                disconnection_times: record.windows.encode(separator),
                updated_at: record.updated_at,
            })
        })
        .collect::<Result<Vec<_>, ScheduleRepositoryError>>()?;
    let updates = batch
        .updates
        .iter()
        .map(|record| {
            Ok((
                column_queue(record)?,
                record.date,
                record.windows.encode(separator),
                record.updated_at,
            ))
        })
        .collect::<Result<Vec<_>, ScheduleRepositoryError>>()?;
    let deletes = batch
        .deletes
        .iter()
        .map(|key| {
            queue_number_to_db(key.number)
                .map(|number| (number, key.date))
                .ok_or_else(|| ScheduleRepositoryError::query(format!("{key} exceeds column range")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PreparedBatch {
        inserts,
        updates,
        deletes,
    })
}

#[async_trait]
impl ScheduleRepository for DieselScheduleRepository {
    async fn load_all(&self) -> Result<Vec<QueueRecord>, ScheduleRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = queue_schedules::table
            .order((queue_schedules::schedule_date, queue_schedules::queue_number))
            .select(QueueScheduleRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter()
            .map(|row| row_to_record(row, self.separator))
            .collect()
    }

    async fn apply_batch(&self, batch: &ScheduleBatch) -> Result<(), ScheduleRepositoryError> {
        let prepared = prepare_batch(batch, self.separator)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                for (number, date) in &prepared.deletes {
                    diesel::delete(queue_schedules::table.find((*number, *date)))
                        .execute(conn)
                        .await?;
                }
                for (number, date, windows, updated_at) in &prepared.updates {
                    let touched = diesel::update(queue_schedules::table.find((*number, *date)))
                        .set(&QueueScheduleUpdate {
                            disconnection_times: windows,
                            updated_at: *updated_at,
                        })
                        .execute(conn)
                        .await?;
                    if touched == 0 {
                        return Err(diesel::result::Error::NotFound);
                    }
                }
                if !prepared.inserts.is_empty() {
                    diesel::insert_into(queue_schedules::table)
                        .values(&prepared.inserts)
                        .execute(conn)
                        .await?;
                }
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }
}
