//! PostgreSQL-backed `SubscriberRepository`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, RunQueryDsl};

use crate::domain::ports::{SubscriberRepository, SubscriberRepositoryError};
use crate::domain::{QueueNumber, SubscriberId, SubscriberRecord, WatermarkAdvance};

use super::diesel_helpers::{
    map_diesel_error_message, map_pool_error_message, queue_number_from_db, queue_number_to_db,
};
use super::models::{NewSubscriberRow, SubscriberRow};
use super::pool::{DbPool, PoolError};
use super::schema::subscribers;

/// Diesel-backed implementation of the subscriber store.
#[derive(Clone)]
pub struct DieselSubscriberRepository {
    pool: DbPool,
}

impl DieselSubscriberRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> SubscriberRepositoryError {
    SubscriberRepositoryError::connection(map_pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> SubscriberRepositoryError {
    SubscriberRepositoryError::query(map_diesel_error_message(error, "subscriber operation"))
}

fn row_to_subscriber(row: SubscriberRow) -> Result<SubscriberRecord, SubscriberRepositoryError> {
    let queue_filter = row
        .queue_filter
        .map(|value| {
            queue_number_from_db(value).ok_or_else(|| {
                SubscriberRepositoryError::query(format!(
                    "subscriber {} has invalid queue filter {value}",
                    row.chat_id
                ))
            })
        })
        .transpose()?;
    Ok(SubscriberRecord {
        id: SubscriberId::new(row.chat_id),
        queue_filter,
        last_received_update: row.last_received_update,
    })
}

fn filter_column(queue_filter: Option<QueueNumber>) -> Result<Option<i32>, SubscriberRepositoryError> {
    queue_filter
        .map(|queue| {
            queue_number_to_db(queue).ok_or_else(|| {
                SubscriberRepositoryError::query(format!("queue filter {queue} exceeds column range"))
            })
        })
        .transpose()
}

#[async_trait]
impl SubscriberRepository for DieselSubscriberRepository {
    async fn load_all(&self) -> Result<Vec<SubscriberRecord>, SubscriberRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = subscribers::table
            .order(subscribers::chat_id)
            .select(SubscriberRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_subscriber).collect()
    }

    async fn find(
        &self,
        id: SubscriberId,
    ) -> Result<Option<SubscriberRecord>, SubscriberRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = subscribers::table
            .find(id.get())
            .select(SubscriberRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_subscriber).transpose()
    }

    async fn insert(&self, subscriber: &SubscriberRecord) -> Result<(), SubscriberRepositoryError> {
        let row = NewSubscriberRow {
            chat_id: subscriber.id.get(),
            queue_filter: filter_column(subscriber.queue_filter)?,
            last_received_update: subscriber.last_received_update,
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(subscribers::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(|error| match error {
                diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    SubscriberRepositoryError::duplicate(subscriber.id.get())
                }
                other => map_diesel_error(other),
            })?;
        Ok(())
    }

    async fn set_queue_filter(
        &self,
        id: SubscriberId,
        queue_filter: Option<QueueNumber>,
    ) -> Result<bool, SubscriberRepositoryError> {
        let column = filter_column(queue_filter)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let touched = diesel::update(subscribers::table.find(id.get()))
            .set(subscribers::queue_filter.eq(column))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(touched > 0)
    }

    async fn remove(&self, id: SubscriberId) -> Result<bool, SubscriberRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let removed = diesel::delete(subscribers::table.find(id.get()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(removed > 0)
    }

    async fn commit_watermarks(
        &self,
        advances: &[WatermarkAdvance],
    ) -> Result<(), SubscriberRepositoryError> {
        if advances.is_empty() {
            return Ok(());
        }
        let advances = advances.to_vec();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        // The filter on the old value keeps watermarks monotonic.
        conn.transaction(|conn| {
            async move {
                for advance in &advances {
                    diesel::update(
                        subscribers::table.find(advance.subscriber_id.get()).filter(
                            subscribers::last_received_update
                                .is_null()
                                .or(subscribers::last_received_update.lt(advance.watermark)),
                        ),
                    )
                    .set(subscribers::last_received_update.eq(Some(advance.watermark)))
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
