//! Queue schedule entities.
//!
//! A [`QueueRecord`] is the persisted mirror of one cell of the published
//! table: the windows of one queue on one date, plus the time its content
//! last changed. [`QueueSchedule`] is the same data as it arrives from the
//! extractor or the ingestion endpoint, before it has a change timestamp.

use std::fmt::{self, Write as _};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::WindowSet;

const DEFAULT_DATE_FORMAT: &str = "%d.%m.%Y";
const DEFAULT_SEPARATOR: char = ';';
const DEFAULT_QUEUE_COUNT: u32 = 6;

/// Validation errors for schedule primitives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleValidationError {
    /// Queue numbers start at one.
    #[error("queue number must be positive, got {0}")]
    NonPositiveQueue(i64),
    /// A date format that cannot render a calendar date.
    #[error("date format `{0}` cannot render a calendar date")]
    UnusableDateFormat(String),
}

/// Positive queue (group) number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct QueueNumber(u32);

impl QueueNumber {
    /// Validate and wrap a queue number.
    ///
    /// # Examples
    /// ```
    /// use schedule_watch::domain::QueueNumber;
    ///
    /// assert!(QueueNumber::new(3).is_ok());
    /// assert!(QueueNumber::new(0).is_err());
    /// ```
    pub fn new(value: i64) -> Result<Self, ScheduleValidationError> {
        u32::try_from(value)
            .ok()
            .filter(|number| *number > 0)
            .map(Self)
            .ok_or(ScheduleValidationError::NonPositiveQueue(value))
    }

    /// Raw numeric value.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for QueueNumber {
    type Error = ScheduleValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<QueueNumber> for i64 {
    fn from(value: QueueNumber) -> Self {
        i64::from(value.0)
    }
}

impl fmt::Display for QueueNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a queue record: one queue on one date.
///
/// Ordering is `(date, number)`, the order in which notifications list
/// records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueueKey {
    /// Calendar date of the windows.
    pub date: NaiveDate,
    /// Queue number.
    pub number: QueueNumber,
}

impl QueueKey {
    /// Build a key.
    pub fn new(number: QueueNumber, date: NaiveDate) -> Self {
        Self { date, number }
    }
}

impl fmt::Display for QueueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue {} on {}", self.number, self.date)
    }
}

/// Incoming schedule entry for one queue on one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSchedule {
    /// Queue number.
    pub number: QueueNumber,
    /// Calendar date.
    pub date: NaiveDate,
    /// Windows in source order.
    pub windows: WindowSet,
}

impl QueueSchedule {
    /// Identity of this entry.
    pub fn key(&self) -> QueueKey {
        QueueKey::new(self.number, self.date)
    }
}

/// Persisted schedule entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRecord {
    /// Queue number.
    pub number: QueueNumber,
    /// Calendar date.
    pub date: NaiveDate,
    /// Windows in source order.
    pub windows: WindowSet,
    /// Time the windows last changed. Not moved by identical rewrites.
    pub updated_at: DateTime<Utc>,
}

impl QueueRecord {
    /// Identity of this record.
    pub fn key(&self) -> QueueKey {
        QueueKey::new(self.number, self.date)
    }
}

/// Everything one fetch of the published page produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSnapshot {
    /// When the page was fetched.
    pub fetched_at: DateTime<Utc>,
    /// Extracted entries; order is not significant.
    pub queues: Vec<QueueSchedule>,
}

/// Formatting and bounds shared by extraction, storage and rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleFormat {
    /// `chrono` format string of the dates in the first table column and in
    /// rendered messages.
    pub date_format: String,
    /// Separator joining windows in their single-string encoding.
    pub separator: char,
    /// Highest queue number a subscriber may filter on.
    pub queue_count: u32,
}

impl Default for ScheduleFormat {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_owned(),
            separator: DEFAULT_SEPARATOR,
            queue_count: DEFAULT_QUEUE_COUNT,
        }
    }
}

impl ScheduleFormat {
    /// Parse a date written in the configured format.
    ///
    /// # Examples
    /// ```
    /// use chrono::NaiveDate;
    /// use schedule_watch::domain::ScheduleFormat;
    ///
    /// let format = ScheduleFormat::default();
    /// assert_eq!(
    ///     format.parse_date(" 10.01.2024 "),
    ///     NaiveDate::from_ymd_opt(2024, 1, 10)
    /// );
    /// ```
    pub fn parse_date(&self, raw: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(raw.trim(), &self.date_format).ok()
    }

    /// Check that `date_format` renders a calendar date.
    ///
    /// Rejects blank formats, unknown specifiers and time-only fields.
    ///
    /// # Examples
    /// ```
    /// use schedule_watch::domain::ScheduleFormat;
    ///
    /// assert!(ScheduleFormat::validate_date_format("%d.%m.%Y").is_ok());
    /// assert!(ScheduleFormat::validate_date_format("%d.%m.%Q").is_err());
    /// ```
    pub fn validate_date_format(date_format: &str) -> Result<(), ScheduleValidationError> {
        let unusable = || ScheduleValidationError::UnusableDateFormat(date_format.to_owned());
        if date_format.trim().is_empty()
            || StrftimeItems::new(date_format).any(|item| matches!(item, Item::Error))
        {
            return Err(unusable());
        }
        let mut sample = String::new();
        write!(sample, "{}", NaiveDate::MIN.format(date_format)).map_err(|_| unusable())
    }

    /// Render a date in the configured format.
    ///
    /// Falls back to ISO 8601 when the format cannot render the date.
    pub fn format_date(&self, date: NaiveDate) -> String {
        let mut rendered = String::new();
        match write!(rendered, "{}", date.format(&self.date_format)) {
            Ok(()) => rendered,
            Err(_) => date.to_string(),
        }
    }
}
