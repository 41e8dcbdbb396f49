//! Shared helpers for Diesel repository implementations.

use tracing::debug;

use crate::domain::QueueNumber;

use super::pool::PoolError;

/// Extract a readable message from a pool error.
pub fn map_pool_error_message(error: PoolError) -> String {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    }
}

/// Extract a readable message from a Diesel error and emit debug context.
pub fn map_diesel_error_message(error: diesel::result::Error, operation: &str) -> String {
    let error_message = error.to_string();
    debug!(%error_message, %operation, "diesel operation failed");
    error_message
}

/// Convert a queue number to the `INTEGER` column type.
pub fn queue_number_to_db(number: QueueNumber) -> Option<i32> {
    i32::try_from(number.get()).ok()
}

/// Convert an `INTEGER` column back into a queue number.
pub fn queue_number_from_db(value: i32) -> Option<QueueNumber> {
    QueueNumber::new(i64::from(value)).ok()
}
