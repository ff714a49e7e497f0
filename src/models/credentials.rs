use std::{fmt, sync::OnceLock};

use regex::Regex;

use crate::error::MonitorError;

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+:[A-Za-z0-9_-]+$").expect("token pattern compiles"))
}

fn chat_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(-?\d+|@[A-Za-z][A-Za-z0-9_]{3,})$").expect("chat pattern compiles")
    })
}

/// Messaging token + destination for one monitoring run. Memory only.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
    chat_id: String,
}

impl Credentials {
    /// Validate a bot token (`<digits>:<secret>`) and a chat id (integer or
    /// `@channel`). Surrounding whitespace is ignored.
    pub fn new(token: &str, chat_id: &str) -> Result<Self, MonitorError> {
        let token = token.trim();
        let chat_id = chat_id.trim();

        if token.is_empty() {
            return Err(MonitorError::InvalidCredentials("token is required".into()));
        }
        if chat_id.is_empty() {
            return Err(MonitorError::InvalidCredentials("chat id is required".into()));
        }
        if !token_pattern().is_match(token) {
            return Err(MonitorError::InvalidCredentials(
                "token must look like <bot id>:<secret>".into(),
            ));
        }
        if !chat_pattern().is_match(chat_id) {
            return Err(MonitorError::InvalidCredentials(
                "chat id must be a numeric id or an @channel name".into(),
            ));
        }

        Ok(Self {
            token: token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bot_id = self.token.split(':').next().unwrap_or_default();
        f.debug_struct("Credentials")
            .field("token", &format_args!("{bot_id}:***"))
            .field("chat_id", &self.chat_id)
            .finish()
    }
}
