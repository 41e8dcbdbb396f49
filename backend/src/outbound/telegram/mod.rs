//! Telegram Bot API outbound adapter.
//!
//! This module provides a thin HTTP implementation of the `MessageSink` port.

mod dto;
mod http_sink;

pub use http_sink::TelegramMessageSink;
