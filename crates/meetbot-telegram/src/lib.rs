//! Telegram front end for the meeting calendar bot.
//!
//! Users keep personal calendar events, publish some of them to other
//! users, and negotiate meetings: the organizer invites participants by id,
//! each invitee confirms or declines, and everyone involved is notified.
//!
//! # Environment Variables
//!
//! Required:
//! - `TELEGRAM_BOT_TOKEN`: Bot token from @BotFather
//!
//! Optional:
//! - `MEETBOT_STATE_DIR`, `MEETBOT_DB_PATH`: where data lives
//! - `MEETBOT_EXPORT_BASE_URL`: base of export download links
//! - `MEETBOT_SESSION_IDLE_TIMEOUT_SECS`: drop unfinished dialogs after this long
//! - `MEETBOT_INVITATION_TTL_HOURS`: decline unanswered invitations after this long
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use meetbot_core::Settings;
//! use meetbot_persistence::CalendarStore;
//! use meetbot_telegram::MeetBot;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(CalendarStore::open("meetbot.db")?);
//!     let bot = MeetBot::new(store, Settings::from_env())?;
//!     bot.start_polling().await?;
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod dialog;
pub mod error;
pub mod handlers;
pub mod messenger;
pub mod render;
pub mod session;
pub mod state;

pub use bot::MeetBot;
pub use dialog::{Dialog, DialogKind};
pub use error::{BotError, Result};
pub use handlers::Command;
pub use messenger::TelegramMessenger;
pub use session::{ConversationSession, SessionManager};
pub use state::{BotState, Inbound, Reply};
