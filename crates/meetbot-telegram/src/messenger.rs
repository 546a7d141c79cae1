//! Outbound delivery through the Telegram API.

use async_trait::async_trait;
use meetbot_core::{DeliveryError, Messenger};
use meetbot_models::UserId;
use teloxide::prelude::*;

/// Sends notifications as private chat messages.
///
/// A user's chat with the bot has the same id as the user.
#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send(&self, user: UserId, text: &str) -> Result<(), DeliveryError> {
        self.bot
            .send_message(ChatId(user.get()), text)
            .await
            .map(|_| ())
            .map_err(|e| DeliveryError {
                user,
                reason: e.to_string(),
            })
    }
}
