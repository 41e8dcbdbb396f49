//! Turns the published schedule table into queue entries.
//!
//! The first cell of every body row is a date; each following cell holds the
//! windows of the queue whose number equals the cell's column position. Only
//! lines containing at least one ASCII digit count as windows, which drops
//! decorative labels and blank lines that share a cell with real times. A
//! line holding the separator is split into several windows.

use tracing::{debug, warn};

use super::{QueueNumber, QueueSchedule, ScheduleFormat, WindowSet};

/// Cell texts of one table row, in column order.
pub type RawTableRow = Vec<String>;

/// A table as delivered by a page adapter.
///
/// `body` is `None` when the page has no table body at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawScheduleTable {
    /// Rows of the first table body, if one exists.
    pub body: Option<Vec<RawTableRow>>,
}

impl RawScheduleTable {
    /// Wrap rows of a table body.
    pub fn with_rows(rows: Vec<RawTableRow>) -> Self {
        Self { body: Some(rows) }
    }
}

/// Reasons a table yields no usable schedule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    /// The page had no table body.
    #[error("schedule page has no table body")]
    NoTableBody,
    /// No row started with a date in the configured format.
    #[error("schedule table has no data rows ({skipped_rows} rows skipped)")]
    NoDataRows {
        /// Rows ignored because their first cell was not a date.
        skipped_rows: usize,
    },
    /// A non-empty first cell did not parse as a date.
    ///
    /// Reported per row; such rows are skipped rather than failing the
    /// whole table.
    #[error("row {row}: `{value}` is not a date")]
    UnparseableDate {
        /// Zero-based row index within the body.
        row: usize,
        /// Offending first-cell text.
        value: String,
    },
}

/// Extracts [`QueueSchedule`] entries from a [`RawScheduleTable`].
#[derive(Debug, Clone)]
pub struct ScheduleExtractor {
    format: ScheduleFormat,
}

impl ScheduleExtractor {
    /// Create an extractor for `format`.
    pub fn new(format: ScheduleFormat) -> Self {
        Self { format }
    }

    /// Extract every `(queue, date, windows)` entry from the table.
    ///
    /// Rows whose first cell is blank or not a date are skipped. Cells with
    /// no window lines produce no entry. Fails only when there is no body or
    /// no row parsed as a date.
    ///
    /// # Examples
    /// ```
    /// use schedule_watch::domain::{RawScheduleTable, ScheduleExtractor, ScheduleFormat};
    ///
    /// let table = RawScheduleTable::with_rows(vec![vec![
    ///     "10.01.2024".into(),
    ///     "08:00-10:00\n18:00-20:00".into(),
    ///     "".into(),
    /// ]]);
    /// let queues = ScheduleExtractor::new(ScheduleFormat::default())
    ///     .extract(&table)
    ///     .expect("table has one data row");
    /// assert_eq!(queues.len(), 1);
    /// assert_eq!(queues[0].windows.encode(';'), "08:00-10:00;18:00-20:00");
    /// ```
    pub fn extract(&self, table: &RawScheduleTable) -> Result<Vec<QueueSchedule>, ExtractionError> {
        let rows = table.body.as_ref().ok_or(ExtractionError::NoTableBody)?;

        let mut queues = Vec::new();
        let mut data_rows = 0_usize;
        let mut skipped_rows = 0_usize;
        for (index, row) in rows.iter().enumerate() {
            match self.parse_row(index, row) {
                Ok(Some(entries)) => {
                    data_rows += 1;
                    queues.extend(entries);
                }
                Ok(None) => skipped_rows += 1,
                Err(error) => {
                    warn!(%error, "skipping schedule row");
                    skipped_rows += 1;
                }
            }
        }

        if data_rows == 0 {
            return Err(ExtractionError::NoDataRows { skipped_rows });
        }
        debug!(data_rows, skipped_rows, entries = queues.len(), "schedule table extracted");
        Ok(queues)
    }

    fn parse_row(
        &self,
        index: usize,
        row: &[String],
    ) -> Result<Option<Vec<QueueSchedule>>, ExtractionError> {
        let Some((first, cells)) = row.split_first() else {
            return Ok(None);
        };
        if first.trim().is_empty() {
            return Ok(None);
        }
        let date = self
            .parse_row_date(first)
            .ok_or_else(|| ExtractionError::UnparseableDate {
                row: index,
                value: first.trim().to_owned(),
            })?;

        let entries = cells
            .iter()
            .enumerate()
            .filter_map(|(offset, cell)| {
                let windows = self.parse_cell(cell)?;
                let number = i64::try_from(offset + 1)
                    .ok()
                    .and_then(|n| QueueNumber::new(n).ok())?;
                Some(QueueSchedule {
                    number,
                    date,
                    windows,
                })
            })
            .collect();
        Ok(Some(entries))
    }

    /// Date cells sometimes carry a weekday on a second line.
    fn parse_row_date(&self, cell: &str) -> Option<chrono::NaiveDate> {
        self.format.parse_date(cell).or_else(|| {
            cell.lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .and_then(|line| self.format.parse_date(line))
        })
    }

    fn parse_cell(&self, cell: &str) -> Option<WindowSet> {
        let lines = cell
            .lines()
            .flat_map(|line| line.split(self.format.separator))
            .map(str::trim)
            .filter(|line| WindowSet::looks_like_window(line))
            .map(str::to_owned)
            .collect::<Vec<_>>();
        if lines.is_empty() {
            return None;
        }
        WindowSet::new(lines, self.format.separator).ok()
    }
}
