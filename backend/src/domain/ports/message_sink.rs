//! Driven port for delivering text messages to subscribers.
use async_trait::async_trait;

use super::define_port_error;
use crate::domain::SubscriberId;

define_port_error! {
    /// Errors surfaced by messaging adapters.
    pub enum MessageSinkError {
        /// The messaging API could not be reached or timed out.
        Transport { message: String } =>
            "message transport failed: {message}",
        /// The messaging API answered but refused the message.
        Rejected { message: String } =>
            "message was rejected: {message}",
    }
}

/// Port for sending one message to one recipient.
///
/// Text is HTML-formatted; adapters must send it with HTML parse mode.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Deliver `text` to `recipient`.
    async fn send(&self, recipient: SubscriberId, text: &str) -> Result<(), MessageSinkError>;
}

/// Fixture sink that drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureMessageSink;

#[async_trait]
impl MessageSink for FixtureMessageSink {
    async fn send(&self, _recipient: SubscriberId, _text: &str) -> Result<(), MessageSinkError> {
        Ok(())
    }
}
