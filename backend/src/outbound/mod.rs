//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed stores using Diesel ORM
//! - **memory**: in-process stores for development and tests
//! - **telegram**: Bot API message delivery
//! - **schedule_page**: HTTP fetch and HTML reading of the published table
//!
//! Adapters are thin translators between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod memory;
pub mod persistence;
pub mod schedule_page;
pub mod telegram;
