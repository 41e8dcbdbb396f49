//! Renders change notifications as Telegram HTML.

use super::{QueueRecord, ScheduleFormat};

const HEADER: &str = "<b>Графіки змінилися:</b>\n";

/// Render one notification listing `records` in the given order.
///
/// Each record gets an underlined sub-header with its queue number and date,
/// followed by its windows one per line. Window text is HTML-escaped.
///
/// # Examples
/// ```
/// use chrono::{NaiveDate, TimeZone, Utc};
/// use schedule_watch::domain::{
///     QueueNumber, QueueRecord, ScheduleFormat, WindowSet, render_update_message,
/// };
///
/// let record = QueueRecord {
///     number: QueueNumber::new(1).expect("queue"),
///     date: NaiveDate::from_ymd_opt(2024, 1, 10).expect("date"),
///     windows: WindowSet::decode("08:00-10:00;18:00-20:00", ';'),
///     updated_at: Utc.with_ymd_and_hms(2024, 1, 10, 6, 0, 0).unwrap(),
/// };
/// let text = render_update_message(&[&record], &ScheduleFormat::default());
/// assert_eq!(
///     text,
///     "<b>Графіки змінилися:</b>\n\n<u>Черга №1 - 10.01.2024</u>\n\n08:00-10:00\n18:00-20:00"
/// );
/// ```
pub fn render_update_message(records: &[&QueueRecord], format: &ScheduleFormat) -> String {
    let mut text = String::from(HEADER);
    for record in records {
        text.push_str(&format!(
            "\n<u>Черга №{} - {}</u>\n\n",
            record.number,
            format.format_date(record.date)
        ));
        for window in record.windows.entries() {
            text.push_str(&escape_html(window));
            text.push('\n');
        }
    }
    while text.ends_with('\n') {
        text.pop();
    }
    text
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            other => escaped.push(other),
        }
    }
    escaped
}
