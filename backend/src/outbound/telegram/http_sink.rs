//! Reqwest-backed Telegram message sink.
//!
//! This adapter owns transport details only: request serialisation, timeout
//! and HTTP error mapping, and decoding the Bot API envelope.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use super::dto::{BotApiResponse, SendMessageRequest};
use crate::domain::SubscriberId;
use crate::domain::ports::{MessageSink, MessageSinkError};

const PARSE_MODE: &str = "HTML";

/// Sends subscriber messages through the Bot API `sendMessage` method.
pub struct TelegramMessageSink {
    client: Client,
    endpoint: Url,
}

impl TelegramMessageSink {
    /// Build a sink for `token` against `api_base` with a per-request timeout.
    ///
    /// ```rust,ignore
    /// let api_base = Url::parse("https://api.telegram.org")?;
    /// let sink = TelegramMessageSink::new(api_base, "123:abc", Duration::from_secs(10))?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when the endpoint URL cannot be built or the reqwest
    /// client cannot be constructed.
    pub fn new(api_base: Url, token: &str, timeout: Duration) -> Result<Self, MessageSinkError> {
        let endpoint = send_message_url(&api_base, token)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| MessageSinkError::transport(error.to_string()))?;
        Ok(Self { client, endpoint })
    }
}

fn send_message_url(api_base: &Url, token: &str) -> Result<Url, MessageSinkError> {
    let base = api_base.as_str().trim_end_matches('/');
    Url::parse(&format!("{base}/bot{token}/sendMessage"))
        .map_err(|error| MessageSinkError::rejected(format!("invalid bot API URL: {error}")))
}

#[async_trait]
impl MessageSink for TelegramMessageSink {
    async fn send(&self, recipient: SubscriberId, text: &str) -> Result<(), MessageSinkError> {
        let body = SendMessageRequest {
            chat_id: recipient.get(),
            text,
            parse_mode: PARSE_MODE,
            disable_web_page_preview: true,
        };
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|error| MessageSinkError::transport(error.without_url().to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|error| MessageSinkError::transport(error.without_url().to_string()))?;
        interpret_response(status, bytes.as_ref())?;
        debug!(recipient = %recipient, "message delivered");
        Ok(())
    }
}

fn interpret_response(status: StatusCode, body: &[u8]) -> Result<(), MessageSinkError> {
    let decoded = serde_json::from_slice::<BotApiResponse>(body).ok();
    if !status.is_success() {
        let detail = decoded
            .map(|response| response.failure_message())
            .unwrap_or_default();
        return Err(MessageSinkError::rejected(format!(
            "status {}{}{detail}",
            status.as_u16(),
            if detail.is_empty() { "" } else { ": " }
        )));
    }
    match decoded {
        Some(response) if response.ok => Ok(()),
        Some(response) => Err(MessageSinkError::rejected(response.failure_message())),
        None => Err(MessageSinkError::rejected("bot API response was not valid JSON")),
    }
}
