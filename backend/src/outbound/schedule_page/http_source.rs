//! Reqwest-backed schedule page source.
//!
//! This adapter owns transport details only: the GET request, timeout and
//! HTTP error mapping, and handing the body to the HTML table reader.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use super::html_table::parse_schedule_table;
use crate::domain::RawScheduleTable;
use crate::domain::ports::{ScheduleSource, ScheduleSourceError};

const DEFAULT_USER_AGENT: &str = "schedule-watch/0.1";

/// Fetches the published schedule page over HTTP.
pub struct HttpSchedulePageSource {
    client: Client,
    page: Url,
}

impl HttpSchedulePageSource {
    /// Build a source for `page` using a reqwest client with an explicit
    /// request timeout.
    ///
    /// ```rust,ignore
    /// let source = HttpSchedulePageSource::new(page, Duration::from_secs(15));
    /// assert!(source.is_ok() || source.is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(page: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self { client, page })
    }
}

#[async_trait]
impl ScheduleSource for HttpSchedulePageSource {
    async fn fetch_table(&self) -> Result<RawScheduleTable, ScheduleSourceError> {
        let response = self
            .client
            .get(self.page.clone())
            .header(reqwest::header::ACCEPT, "text/html")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status_error(status));
        }
        let html = response.text().await.map_err(|error| {
            ScheduleSourceError::decode(format!("schedule page body unreadable: {error}"))
        })?;
        debug!(bytes = html.len(), page = %self.page, "schedule page fetched");
        Ok(parse_schedule_table(&html))
    }
}

fn map_transport_error(error: reqwest::Error) -> ScheduleSourceError {
    if error.is_timeout() {
        ScheduleSourceError::fetch(format!("request timed out: {error}"))
    } else {
        ScheduleSourceError::fetch(error.to_string())
    }
}

fn map_status_error(status: StatusCode) -> ScheduleSourceError {
    ScheduleSourceError::fetch(format!("status {}", status.as_u16()))
}
