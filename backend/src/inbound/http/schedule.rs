//! Schedule ingestion HTTP handlers.
//!
//! ```text
//! POST /update
//! POST /refresh
//! ```

use actix_web::{post, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::ports::UpdateCycleReport;
use crate::domain::{Error, QueueNumber, QueueSchedule, ScheduleSnapshot, WindowSet};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// One queue entry of an ingestion payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuePayload {
    pub number: i64,
    pub date: NaiveDate,
    /// Windows joined with the configured separator.
    pub disconnection_times: String,
}

/// Wire shape of a snapshot produced by the extractor.
///
/// # Examples
/// ```
/// use schedule_watch::inbound::http::schedule::ScheduleSnapshotPayload;
///
/// let payload: ScheduleSnapshotPayload = serde_json::from_str(
///     r#"{"fetchedAt":"2024-01-10T06:00:00Z","queues":[
///         {"number":1,"date":"2024-01-10","disconnectionTimes":"08:00-10:00"}]}"#,
/// )
/// .expect("valid payload");
/// assert_eq!(payload.queues.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSnapshotPayload {
    pub fetched_at: DateTime<Utc>,
    pub queues: Vec<QueuePayload>,
}

impl ScheduleSnapshotPayload {
    /// Encode `snapshot`, joining windows with `separator`.
    pub fn from_snapshot(snapshot: &ScheduleSnapshot, separator: char) -> Self {
        Self {
            fetched_at: snapshot.fetched_at,
            queues: snapshot
                .queues
                .iter()
                .map(|queue| QueuePayload {
                    number: i64::from(queue.number.get()),
                    date: queue.date,
                    disconnection_times: queue.windows.encode(separator),
                })
                .collect(),
        }
    }

    /// Decode into a domain snapshot, splitting windows on `separator`.
    ///
    /// Entries whose windows decode to nothing carry no disconnection and
    /// are left out of the snapshot.
    ///
    /// # Errors
    /// Returns [`crate::domain::ErrorCode::InvalidRequest`] naming the first
    /// entry whose queue number is not positive or whose windows include one
    /// without a digit.
    pub fn into_snapshot(self, separator: char) -> Result<ScheduleSnapshot, Error> {
        let mut queues = Vec::with_capacity(self.queues.len());
        for (index, queue) in self.queues.into_iter().enumerate() {
            let number = QueueNumber::new(queue.number).map_err(|err| {
                Error::invalid_request(err.to_string()).with_details(json!({
                    "field": format!("queues[{index}].number"),
                    "value": queue.number,
                    "code": "invalid_queue_number",
                }))
            })?;
            let windows = WindowSet::decode(&queue.disconnection_times, separator);
            if let Some(entry) = windows
                .entries()
                .find(|entry| !WindowSet::looks_like_window(entry))
            {
                return Err(Error::invalid_request(format!(
                    "window `{entry}` does not name a time"
                ))
                .with_details(json!({
                    "field": format!("queues[{index}].disconnectionTimes"),
                    "value": entry,
                    "code": "invalid_window",
                })));
            }
            if windows.is_empty() {
                continue;
            }
            queues.push(QueueSchedule {
                number,
                date: queue.date,
                windows,
            });
        }
        Ok(ScheduleSnapshot {
            fetched_at: self.fetched_at,
            queues,
        })
    }
}

/// Reconcile a pushed snapshot and notify subscribers of changes.
#[post("/update")]
pub async fn apply_update(
    state: web::Data<HttpState>,
    payload: web::Json<ScheduleSnapshotPayload>,
) -> ApiResult<web::Json<UpdateCycleReport>> {
    let snapshot = payload.into_inner().into_snapshot(state.format.separator)?;
    let report = state.updates.apply_snapshot(snapshot).await?;
    Ok(web::Json(report))
}

/// Fetch the published page now and run a full cycle.
#[post("/refresh")]
pub async fn refresh_schedule(
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<UpdateCycleReport>> {
    let report = state.updates.refresh_from_source().await?;
    Ok(web::Json(report))
}
