//! Published schedule page adapters.
//!
//! This module provides a thin HTTP implementation of the `ScheduleSource`
//! port plus the HTML reader it relies on.

mod disabled;
mod html_table;
mod http_source;

pub use disabled::UnconfiguredSchedulePageSource;
pub use http_source::HttpSchedulePageSource;
