//! Domain primitives, services and ports.
//!
//! Purpose: model the mirrored outage schedule, the subscribers following
//! it, and the cycle that keeps both in step with the published page. Types
//! here never depend on HTTP, SQL or HTML crates; adapters reach them only
//! through [`ports`].
//!
//! Public surface:
//! - Error, ErrorCode: transport-agnostic failure payload.
//! - QueueRecord, ScheduleSnapshot, WindowSet: schedule data.
//! - SubscriberRecord: subscription state and watermark.
//! - ScheduleExtractor, ScheduleReconciler, Notifier: the update pipeline.
//! - ScheduleUpdateService, SubscriptionService: driving port
//!   implementations wired by the server.

pub mod error;
pub mod extraction;
pub mod notification_message;
pub mod notifier;
pub mod ports;
pub mod reconciler;
pub mod schedule;
mod store_errors;
pub mod subscriber;
pub mod subscription;
#[cfg(test)]
pub(crate) mod test_fixtures;
pub mod trace_id;
pub mod update_cycle;
pub mod windows;

pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::extraction::{ExtractionError, RawScheduleTable, RawTableRow, ScheduleExtractor};
pub use self::notification_message::render_update_message;
pub use self::notifier::{DeliveryReport, DeliveryStatus, Notifier, NotifyOutcome, select_candidates};
pub use self::reconciler::{ReconcileOutcome, ReconcilePlan, ScheduleReconciler, plan_reconciliation};
pub use self::schedule::{
    QueueKey, QueueNumber, QueueRecord, QueueSchedule, ScheduleFormat, ScheduleSnapshot,
    ScheduleValidationError,
};
pub use self::subscriber::{SubscriberId, SubscriberRecord, WatermarkAdvance};
pub use self::subscription::{ParsedCommand, SubscriptionService, parse_command};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::update_cycle::{ScheduleUpdateService, fetch_snapshot};
pub use self::windows::{WindowSet, WindowSetError};
