//! Maps store port errors onto domain errors.

use super::Error;
use super::ports::{ScheduleRepositoryError, SubscriberRepositoryError};

pub(crate) fn map_schedule_error(error: ScheduleRepositoryError) -> Error {
    match error {
        ScheduleRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("schedule store unavailable: {message}"))
        }
        ScheduleRepositoryError::Query { message } => {
            Error::internal(format!("schedule store query failed: {message}"))
        }
    }
}

pub(crate) fn map_subscriber_error(error: SubscriberRepositoryError) -> Error {
    match error {
        SubscriberRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("subscriber store unavailable: {message}"))
        }
        SubscriberRepositoryError::Query { message } => {
            Error::internal(format!("subscriber store query failed: {message}"))
        }
        SubscriberRepositoryError::Duplicate { subscriber_id } => {
            Error::invalid_request(format!("subscriber {subscriber_id} is already registered"))
        }
    }
}
