//! Driven port for obtaining the published schedule table.
//!
//! Adapters own fetching and HTML parsing; the domain only sees the table
//! body as rows of cell texts.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::RawScheduleTable;

define_port_error! {
    /// Errors raised while fetching the schedule page.
    pub enum ScheduleSourceError {
        /// The page could not be downloaded.
        Fetch { message: String } =>
            "schedule page fetch failed: {message}",
        /// The page body could not be read as a document.
        Decode { message: String } =>
            "schedule page decode failed: {message}",
    }
}

/// Port for fetching the current schedule table.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// Download the page and return its first table body.
    async fn fetch_table(&self) -> Result<RawScheduleTable, ScheduleSourceError>;
}

/// Fixture source returning a page with no table body.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureScheduleSource;

#[async_trait]
impl ScheduleSource for FixtureScheduleSource {
    async fn fetch_table(&self) -> Result<RawScheduleTable, ScheduleSourceError> {
        Ok(RawScheduleTable::default())
    }
}
