//! Server settings loaded via OrthoConfig.
//!
//! Every value can come from the command line, `SCHEDULE_WATCH_*` environment
//! variables or a configuration file. Absent values fall back to the
//! defaults below.

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use reqwest::Url;
use serde::Deserialize;

use schedule_watch::domain::ScheduleFormat;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const DEFAULT_SEND_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;

/// Errors raised while interpreting loaded settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// A required value is absent.
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
    /// A value could not be interpreted.
    #[error("invalid setting `{field}`: {reason}")]
    Invalid {
        /// Setting name.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

fn invalid(field: &'static str, reason: impl ToString) -> SettingsError {
    SettingsError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

/// Values controlling the HTTP server and its adapters.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SCHEDULE_WATCH")]
pub struct ServerSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection string; in-memory stores are used when absent.
    pub database_url: Option<String>,
    /// Upper bound on pooled database connections.
    pub db_max_connections: Option<u32>,
    /// Bot API token used to deliver messages.
    pub telegram_token: Option<String>,
    /// Bot API base URL.
    pub telegram_api_base: Option<String>,
    /// Per-message send timeout in seconds.
    pub send_timeout_secs: Option<u64>,
    /// Published schedule page; `/refresh` fails while unset.
    pub schedule_page_url: Option<String>,
    /// Page fetch timeout in seconds.
    pub page_timeout_secs: Option<u64>,
    /// Poll the page on this period when set.
    pub refresh_interval_secs: Option<u64>,
    /// `chrono` format of table and message dates.
    pub date_format: Option<String>,
    /// Single character joining windows in stored and wire encodings.
    pub separator: Option<String>,
    /// Highest queue number accepted by `/queue`.
    pub queue_count: Option<u32>,
}

impl ServerSettings {
    /// Listening address.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        self.bind_addr
            .as_deref()
            .unwrap_or(DEFAULT_BIND_ADDR)
            .parse()
            .map_err(|err| invalid("bind_addr", err))
    }

    /// Pool size cap.
    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .max(1)
    }

    /// Bot API token; required.
    pub fn telegram_token(&self) -> Result<&str, SettingsError> {
        self.telegram_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(SettingsError::Missing("telegram_token"))
    }

    /// Bot API base URL.
    pub fn telegram_api_base(&self) -> Result<Url, SettingsError> {
        Url::parse(
            self.telegram_api_base
                .as_deref()
                .unwrap_or(DEFAULT_TELEGRAM_API_BASE),
        )
        .map_err(|err| invalid("telegram_api_base", err))
    }

    /// Per-message send timeout.
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs.unwrap_or(DEFAULT_SEND_TIMEOUT_SECS))
    }

    /// Schedule page URL, if configured.
    pub fn schedule_page_url(&self) -> Result<Option<Url>, SettingsError> {
        self.schedule_page_url
            .as_deref()
            .map(|raw| Url::parse(raw).map_err(|err| invalid("schedule_page_url", err)))
            .transpose()
    }

    /// Page fetch timeout.
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs.unwrap_or(DEFAULT_PAGE_TIMEOUT_SECS))
    }

    /// Polling period; zero disables polling.
    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Date format, separator and queue bound shared by the services.
    pub fn schedule_format(&self) -> Result<ScheduleFormat, SettingsError> {
        let mut format = ScheduleFormat::default();
        if let Some(date_format) = &self.date_format {
            ScheduleFormat::validate_date_format(date_format)
                .map_err(|err| invalid("date_format", err))?;
            date_format.clone_into(&mut format.date_format);
        }
        if let Some(raw) = &self.separator {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(separator), None) if !separator.is_whitespace() => {
                    format.separator = separator;
                }
                _ => {
                    return Err(invalid(
                        "separator",
                        format!("expected one non-space character, got {raw:?}"),
                    ));
                }
            }
        }
        if let Some(queue_count) = self.queue_count {
            if queue_count == 0 {
                return Err(invalid("queue_count", "must be at least 1"));
            }
            format.queue_count = queue_count;
        }
        Ok(format)
    }
}
