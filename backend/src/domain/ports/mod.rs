//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod message_sink;
mod schedule_repository;
mod schedule_source;
mod schedule_update_command;
mod subscriber_repository;
mod subscription_command;

#[cfg(test)]
pub use message_sink::MockMessageSink;
pub use message_sink::{FixtureMessageSink, MessageSink, MessageSinkError};
#[cfg(test)]
pub use schedule_repository::MockScheduleRepository;
pub use schedule_repository::{
    FixtureScheduleRepository, ScheduleBatch, ScheduleRepository, ScheduleRepositoryError,
};
#[cfg(test)]
pub use schedule_source::MockScheduleSource;
pub use schedule_source::{FixtureScheduleSource, ScheduleSource, ScheduleSourceError};
#[cfg(test)]
pub use schedule_update_command::MockScheduleUpdateCommand;
pub use schedule_update_command::{
    FixtureScheduleUpdateCommand, NotificationSummary, ReconcileSummary, ScheduleUpdateCommand,
    UpdateCycleReport,
};
#[cfg(test)]
pub use subscriber_repository::MockSubscriberRepository;
pub use subscriber_repository::{
    FixtureSubscriberRepository, SubscriberRepository, SubscriberRepositoryError,
};
#[cfg(test)]
pub use subscription_command::MockSubscriptionCommand;
pub use subscription_command::{
    CommandOutcome, FixtureSubscriptionCommand, IncomingMessage, SubscriptionCommand,
};

#[cfg(test)]
mod tests;
