//! Bot API request and response bodies.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(super) struct SendMessageRequest<'a> {
    pub(super) chat_id: i64,
    pub(super) text: &'a str,
    pub(super) parse_mode: &'static str,
    pub(super) disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct BotApiResponse {
    pub(super) ok: bool,
    #[serde(default)]
    pub(super) error_code: Option<u16>,
    #[serde(default)]
    pub(super) description: Option<String>,
}

impl BotApiResponse {
    pub(super) fn failure_message(&self) -> String {
        match (self.error_code, self.description.as_deref()) {
            (Some(code), Some(description)) => format!("{code}: {description}"),
            (None, Some(description)) => description.to_owned(),
            (Some(code), None) => format!("error code {code}"),
            (None, None) => "bot API returned ok=false".to_owned(),
        }
    }
}
