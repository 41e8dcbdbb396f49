//! In-process `SubscriberRepository`.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::ports::{SubscriberRepository, SubscriberRepositoryError};
use crate::domain::{QueueNumber, SubscriberId, SubscriberRecord, WatermarkAdvance};

/// Subscribers held in a mutex-guarded map keyed by recipient id.
#[derive(Debug, Default)]
pub struct InMemorySubscriberRepository {
    subscribers: Mutex<BTreeMap<SubscriberId, SubscriberRecord>>,
}

impl InMemorySubscriberRepository {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `subscribers`.
    pub fn with_subscribers(subscribers: impl IntoIterator<Item = SubscriberRecord>) -> Self {
        let subscribers = subscribers
            .into_iter()
            .map(|subscriber| (subscriber.id, subscriber))
            .collect();
        Self {
            subscribers: Mutex::new(subscribers),
        }
    }
}

fn poisoned() -> SubscriberRepositoryError {
    SubscriberRepositoryError::connection("subscriber store lock poisoned")
}

#[async_trait]
impl SubscriberRepository for InMemorySubscriberRepository {
    async fn load_all(&self) -> Result<Vec<SubscriberRecord>, SubscriberRepositoryError> {
        let subscribers = self.subscribers.lock().map_err(|_| poisoned())?;
        Ok(subscribers.values().cloned().collect())
    }

    async fn find(
        &self,
        id: SubscriberId,
    ) -> Result<Option<SubscriberRecord>, SubscriberRepositoryError> {
        let subscribers = self.subscribers.lock().map_err(|_| poisoned())?;
        Ok(subscribers.get(&id).cloned())
    }

    async fn insert(&self, subscriber: &SubscriberRecord) -> Result<(), SubscriberRepositoryError> {
        let mut subscribers = self.subscribers.lock().map_err(|_| poisoned())?;
        if subscribers.contains_key(&subscriber.id) {
            return Err(SubscriberRepositoryError::duplicate(subscriber.id.get()));
        }
        subscribers.insert(subscriber.id, subscriber.clone());
        Ok(())
    }

    async fn set_queue_filter(
        &self,
        id: SubscriberId,
        queue_filter: Option<QueueNumber>,
    ) -> Result<bool, SubscriberRepositoryError> {
        let mut subscribers = self.subscribers.lock().map_err(|_| poisoned())?;
        Ok(subscribers
            .get_mut(&id)
            .map(|subscriber| subscriber.queue_filter = queue_filter)
            .is_some())
    }

    async fn remove(&self, id: SubscriberId) -> Result<bool, SubscriberRepositoryError> {
        let mut subscribers = self.subscribers.lock().map_err(|_| poisoned())?;
        Ok(subscribers.remove(&id).is_some())
    }

    async fn commit_watermarks(
        &self,
        advances: &[WatermarkAdvance],
    ) -> Result<(), SubscriberRepositoryError> {
        let mut subscribers = self.subscribers.lock().map_err(|_| poisoned())?;
        for advance in advances {
            // Removed subscribers are skipped; watermarks never move back.
            let Some(subscriber) = subscribers.get_mut(&advance.subscriber_id) else {
                continue;
            };
            if subscriber
                .last_received_update
                .is_none_or(|current| current < advance.watermark)
            {
                subscriber.last_received_update = Some(advance.watermark);
            }
        }
        Ok(())
    }
}
