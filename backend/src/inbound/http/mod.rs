//! HTTP inbound adapter exposing the ingestion, webhook and probe endpoints.

pub mod error;
pub mod health;
pub mod schedule;
pub mod state;
pub mod telegram;

pub use error::{ApiResult, json_config};
