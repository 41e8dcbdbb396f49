//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! This module provides concrete implementations of the schedule and
//! subscriber store ports backed by PostgreSQL via Diesel with async support
//! through `diesel-async` and `bb8` connection pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: repositories only translate between Diesel rows and
//!   domain records. Reconciliation and watermark rules live in the domain.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **Atomic writes**: schedule batches and watermark commits each run in
//!   one transaction.
//!
//! # Example
//!
//! ```ignore
//! use schedule_watch::outbound::persistence::{DbPool, DieselScheduleRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/schedule")).await?;
//! let repo = DieselScheduleRepository::new(pool, ';');
//! ```

pub(crate) mod diesel_helpers;
mod diesel_schedule_repository;
mod diesel_subscriber_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_schedule_repository::DieselScheduleRepository;
pub use diesel_subscriber_repository::DieselSubscriberRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
