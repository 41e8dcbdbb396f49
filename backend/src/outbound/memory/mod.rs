//! In-process store adapters.
//!
//! Used when no database URL is configured and by integration tests. State
//! lives for the lifetime of the process only.

mod schedule_store;
mod subscriber_store;

pub use schedule_store::InMemoryScheduleRepository;
pub use subscriber_store::InMemorySubscriberRepository;
