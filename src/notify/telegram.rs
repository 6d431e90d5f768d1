use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::format::format_issue_alert;
use super::{Notifier, NotifyError};
use crate::github::types::Issue;

const TELEGRAM_API: &str = "https://api.telegram.org";
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends alerts to one Telegram chat through the Bot API
#[derive(Clone)]
pub struct TelegramNotifier {
    http: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(http: reqwest::Client, bot_token: String, chat_id: String) -> Self {
        Self {
            http,
            bot_token,
            chat_id,
        }
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", TELEGRAM_API, self.bot_token)
    }

    /// Send an HTML-formatted message to the configured chat
    pub async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: false,
        };

        let response = self
            .http
            .post(self.send_message_url())
            .timeout(SEND_TIMEOUT)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let body: Option<ApiResponse> = response.json().await.ok();

        match body {
            Some(ApiResponse { ok: true, .. }) if status.is_success() => Ok(()),
            Some(ApiResponse { description, .. }) => Err(NotifyError::Rejected {
                status: status.as_u16(),
                description: description.unwrap_or_else(|| "no description".to_string()),
            }),
            None => Err(NotifyError::Rejected {
                status: status.as_u16(),
                description: "unparseable response".to_string(),
            }),
        }
    }
}

impl Notifier for TelegramNotifier {
    async fn deliver(&self, issue: &Issue, repo: &str) -> Result<(), NotifyError> {
        let message = format_issue_alert(issue, repo);
        self.send_message(&message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier(bot_token: &str) -> TelegramNotifier {
        let _ = rustls::crypto::ring::default_provider().install_default();
        TelegramNotifier::new(reqwest::Client::new(), bot_token.to_string(), "-100".to_string())
    }

    #[test]
    fn test_send_message_url() {
        let notifier = notifier("123:abc");
        assert_eq!(
            notifier.send_message_url(),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let notifier = notifier("123:secret");
        let debug = format!("{:?}", notifier);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("-100"));
    }

    #[test]
    fn test_payload_shape() {
        let payload = SendMessage {
            chat_id: "-100",
            text: "<b>hi</b>",
            parse_mode: "HTML",
            disable_web_page_preview: false,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "chat_id": "-100",
                "text": "<b>hi</b>",
                "parse_mode": "HTML",
                "disable_web_page_preview": false
            })
        );
    }
}
