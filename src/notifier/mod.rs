//! Outbound messaging: the `Notifier` seam, message texts and the Telegram client.

pub mod messages;
pub mod telegram;

use async_trait::async_trait;

use crate::error::NotifierError;
use crate::models::Credentials;

pub use messages::Language;
pub use telegram::TelegramNotifier;

/// Delivers one text message to the destination named by `credentials`.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, credentials: &Credentials, text: &str) -> Result<(), NotifierError>;
}
