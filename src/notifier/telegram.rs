use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Notifier;
use crate::error::NotifierError;
use crate::models::Credentials;
use crate::settings::NotifierSettings;

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram Bot API client (`sendMessage`).
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(settings: &NotifierSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self {
            client,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, token: &str) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, credentials: &Credentials, text: &str) -> Result<(), NotifierError> {
        let body = SendMessage {
            chat_id: credentials.chat_id(),
            text,
        };
        // reqwest errors carry the URL, which embeds the token.
        let response = self
            .client
            .post(self.endpoint(credentials.token()))
            .json(&body)
            .send()
            .await
            .map_err(|err| NotifierError::from(err.without_url()))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|err| NotifierError::from(err.without_url()))?;
        check_reply(status.as_u16(), &raw)
    }
}

fn check_reply(status: u16, raw: &str) -> Result<(), NotifierError> {
    match serde_json::from_str::<ApiReply>(raw) {
        Ok(reply) if reply.ok && (200..300).contains(&status) => Ok(()),
        Ok(reply) => Err(NotifierError::Rejected {
            status,
            description: reply.description.unwrap_or_else(|| "no description".into()),
        }),
        Err(_) => Err(NotifierError::Rejected {
            status,
            description: crate::utils::logging::preview(raw, 200).to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_embeds_token() {
        let notifier = TelegramNotifier::new(&NotifierSettings {
            api_base: "https://api.example.org/".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            notifier.endpoint("123:abc"),
            "https://api.example.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn ok_reply_is_success() {
        assert!(check_reply(200, r#"{"ok":true,"result":{"message_id":7}}"#).is_ok());
    }

    #[test]
    fn rejected_reply_keeps_description() {
        let err = check_reply(400, r#"{"ok":false,"description":"Bad Request: chat not found"}"#)
            .unwrap_err();
        match err {
            NotifierError::Rejected { status, description } => {
                assert_eq!(status, 400);
                assert!(description.contains("chat not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_json_reply_is_rejected() {
        assert!(matches!(
            check_reply(502, "<html>Bad Gateway</html>"),
            Err(NotifierError::Rejected { status: 502, .. })
        ));
    }
}
