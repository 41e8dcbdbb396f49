//! Telegram webhook handler.
//!
//! ```text
//! POST /message
//! ```
//!
//! Only text messages are routed to the subscription commands. Every other
//! update kind is acknowledged so the Bot API does not redeliver it.

use actix_web::{HttpResponse, post, web};
use serde::Deserialize;
use tracing::debug;

use crate::domain::SubscriberId;
use crate::domain::ports::IncomingMessage;
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Subset of a Bot API `Update` the webhook understands.
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

/// Subset of a Bot API `Message`.
#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    #[serde(default)]
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    #[serde(default)]
    pub text: Option<String>,
}

/// Message author.
#[derive(Debug, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
}

/// Conversation the message arrived in.
#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

impl TelegramUpdate {
    /// Command carried by this update, if it is a message.
    ///
    /// The author is the recipient; channel posts without one fall back to
    /// the chat. Missing text is treated as an empty message.
    pub fn into_incoming(self) -> Option<IncomingMessage> {
        let message = self.message?;
        let sender = message.from.map_or(message.chat.id, |user| user.id);
        Some(IncomingMessage {
            sender: SubscriberId::new(sender),
            text: message.text.unwrap_or_default(),
        })
    }
}

/// Receive one webhook update.
#[post("/message")]
pub async fn receive_message(
    state: web::Data<HttpState>,
    payload: web::Json<TelegramUpdate>,
) -> ApiResult<HttpResponse> {
    let update = payload.into_inner();
    let update_id = update.update_id;
    let Some(message) = update.into_incoming() else {
        debug!(update_id, "ignoring non-message update");
        return Ok(HttpResponse::Ok().finish());
    };
    let outcome = state.subscriptions.handle_message(message).await?;
    Ok(HttpResponse::Ok().json(outcome))
}
