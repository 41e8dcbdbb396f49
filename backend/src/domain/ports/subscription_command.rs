//! Driving port for chat commands sent by subscribers.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{Error, QueueNumber, SubscriberId};

/// A text message received from a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Chat the message came from; replies go back here.
    pub sender: SubscriberId,
    /// Message text as typed.
    pub text: String,
}

/// What handling one message did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// A new subscriber was registered and sent the current schedule.
    Subscribed {
        /// Whether the catch-up message was delivered.
        catch_up_delivered: bool,
    },
    /// `/start` from an existing subscriber.
    AlreadySubscribed,
    /// The queue filter was replaced.
    FilterChanged {
        /// New filter; `None` follows every queue.
        queue: Option<QueueNumber>,
    },
    /// `/queue` from a chat that never sent `/start`.
    NotSubscribed,
    /// `/queue` with an argument outside `0..=queue_count`.
    InvalidQueue,
    /// The subscriber was removed (or was never registered).
    Unsubscribed,
    /// Anything that is not a known command.
    Unsupported,
}

/// Driving port for subscription management.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionCommand: Send + Sync {
    /// Interpret `message`, update the subscriber store and reply.
    async fn handle_message(&self, message: IncomingMessage) -> Result<CommandOutcome, Error>;
}

/// Fixture command that treats every message as unsupported.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureSubscriptionCommand;

#[async_trait]
impl SubscriptionCommand for FixtureSubscriptionCommand {
    async fn handle_message(&self, _message: IncomingMessage) -> Result<CommandOutcome, Error> {
        Ok(CommandOutcome::Unsupported)
    }
}
