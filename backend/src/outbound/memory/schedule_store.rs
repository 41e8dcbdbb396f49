//! In-process `ScheduleRepository`.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::ports::{ScheduleBatch, ScheduleRepository, ScheduleRepositoryError};
use crate::domain::{QueueKey, QueueRecord};

/// Schedule mirror held in a mutex-guarded ordered map.
///
/// A batch is validated against a working copy and only swapped in when
/// every statement succeeded, so readers never observe a partial cycle.
#[derive(Debug, Default)]
pub struct InMemoryScheduleRepository {
    records: Mutex<BTreeMap<QueueKey, QueueRecord>>,
}

impl InMemoryScheduleRepository {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `records`; later duplicates replace earlier ones.
    pub fn with_records(records: impl IntoIterator<Item = QueueRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.key(), record))
            .collect();
        Self {
            records: Mutex::new(records),
        }
    }
}

fn poisoned() -> ScheduleRepositoryError {
    ScheduleRepositoryError::connection("schedule store lock poisoned")
}

fn apply_to(
    records: &mut BTreeMap<QueueKey, QueueRecord>,
    batch: &ScheduleBatch,
) -> Result<(), ScheduleRepositoryError> {
    for key in &batch.deletes {
        if records.remove(key).is_none() {
            return Err(ScheduleRepositoryError::query(format!(
                "cannot delete missing {key}"
            )));
        }
    }
    for record in &batch.updates {
        let Some(slot) = records.get_mut(&record.key()) else {
            return Err(ScheduleRepositoryError::query(format!(
                "cannot update missing {}",
                record.key()
            )));
        };
        *slot = record.clone();
    }
    for record in &batch.inserts {
        if records.insert(record.key(), record.clone()).is_some() {
            return Err(ScheduleRepositoryError::query(format!(
                "{} already exists",
                record.key()
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl ScheduleRepository for InMemoryScheduleRepository {
    async fn load_all(&self) -> Result<Vec<QueueRecord>, ScheduleRepositoryError> {
        let records = self.records.lock().map_err(|_| poisoned())?;
        Ok(records.values().cloned().collect())
    }

    async fn apply_batch(&self, batch: &ScheduleBatch) -> Result<(), ScheduleRepositoryError> {
        let mut records = self.records.lock().map_err(|_| poisoned())?;
        let mut working = records.clone();
        apply_to(&mut working, batch)?;
        *records = working;
        Ok(())
    }
}
