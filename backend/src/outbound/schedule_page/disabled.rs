//! Source used when no schedule page is configured.

use async_trait::async_trait;

use crate::domain::RawScheduleTable;
use crate::domain::ports::{ScheduleSource, ScheduleSourceError};

/// Fails every fetch; snapshots must then arrive through ingestion.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredSchedulePageSource;

#[async_trait]
impl ScheduleSource for UnconfiguredSchedulePageSource {
    async fn fetch_table(&self) -> Result<RawScheduleTable, ScheduleSourceError> {
        Err(ScheduleSourceError::fetch("no schedule page URL is configured"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_fetch_fails() {
        let error = UnconfiguredSchedulePageSource
            .fetch_table()
            .await
            .expect_err("fetch must fail");

        assert!(matches!(error, ScheduleSourceError::Fetch { .. }));
    }
}
