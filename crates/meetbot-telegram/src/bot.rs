//! Main Telegram bot implementation.

use std::sync::Arc;

use meetbot_core::Settings;
use meetbot_persistence::CalendarStore;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use tokio::time::interval;
use tracing::{info, warn};

use crate::error::{BotError, Result};
use crate::handlers::{handle_command, handle_message, handle_unparsed, Command};
use crate::messenger::TelegramMessenger;
use crate::state::BotState;

/// The meeting calendar bot.
pub struct MeetBot {
    /// The teloxide bot instance.
    bot: Bot,
    /// Shared state across handlers.
    state: Arc<BotState>,
}

impl MeetBot {
    /// Create a bot over `store`.
    ///
    /// Requires `TELEGRAM_BOT_TOKEN` environment variable to be set.
    pub fn new(store: Arc<CalendarStore>, settings: Settings) -> Result<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN").map_err(|_| BotError::NoToken)?;
        let bot = Bot::new(token);
        let messenger = Arc::new(TelegramMessenger::new(bot.clone()));
        let state = Arc::new(BotState::new(store, messenger, settings));
        Ok(Self { bot, state })
    }

    /// Get the bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| BotError::BotStartFailed(e.to_string()))?;
        Ok(me.username().to_string())
    }

    /// Run in polling mode until Ctrl+C.
    pub async fn start_polling(&self) -> Result<()> {
        info!("Starting bot in polling mode...");

        if self.state.settings().needs_maintenance() {
            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                maintenance_loop(state).await;
            });
        }

        let state_for_commands = Arc::clone(&self.state);
        let state_for_unparsed = Arc::clone(&self.state);
        let state_for_messages = Arc::clone(&self.state);

        let handler = dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                        let state = Arc::clone(&state_for_commands);
                        async move { handle_command(bot, msg, cmd, state).await }
                    }),
            )
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| msg.text().map(|t| t.starts_with('/')).unwrap_or(false))
                    .endpoint(move |bot: Bot, msg: Message| {
                        let state = Arc::clone(&state_for_unparsed);
                        async move { handle_unparsed(bot, msg, state).await }
                    }),
            )
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| msg.text().map(|t| !t.starts_with('/')).unwrap_or(false))
                    .endpoint(move |bot: Bot, msg: Message| {
                        let state = Arc::clone(&state_for_messages);
                        async move { handle_message(bot, msg, state).await }
                    }),
            );

        info!("Bot is running! Send /start to begin.");

        Dispatcher::builder(self.bot.clone(), handler)
            .default_handler(|upd| async move {
                warn!("Unhandled update: {:?}", upd);
            })
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        Ok(())
    }
}

/// Background task that drops idle dialogs and expires stale invitations.
async fn maintenance_loop(state: Arc<BotState>) {
    let mut tick = interval(state.settings().maintenance_interval);
    info!(
        every_secs = state.settings().maintenance_interval.as_secs(),
        "Maintenance loop started"
    );
    loop {
        tick.tick().await;
        state.maintain().await;
    }
}
