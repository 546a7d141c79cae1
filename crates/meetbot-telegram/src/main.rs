//! Meeting calendar bot binary.
//!
//! Start the bot with:
//! ```bash
//! TELEGRAM_BOT_TOKEN=xxx cargo run -p meetbot-telegram
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use meetbot_core::{config, Settings};
use meetbot_persistence::CalendarStore;
use meetbot_telegram::MeetBot;
use tracing_subscriber::EnvFilter;

/// Meeting calendar bot - keep a calendar and negotiate meetings over Telegram
#[derive(Parser, Debug)]
#[command(name = "meetbot-telegram")]
#[command(about = "Telegram bot for personal calendars and multi-user meetings")]
struct Args {
    /// Database file (default: $MEETBOT_DB_PATH or ~/.meetbot/db/meetbot.sqlite3)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load environment variables from config directory first
    let env_path = config::env_file();
    if env_path.exists() {
        let _ = dotenvy::from_path(&env_path);
    }
    let _ = dotenvy::from_filename(".env.local").or_else(|_| dotenvy::dotenv());

    let filter = match args.verbose {
        0 => "meetbot_telegram=info,meetbot_core=info,teloxide=warn",
        1 => "meetbot_telegram=debug,meetbot_core=debug,meetbot_persistence=debug,teloxide=info",
        2 => "meetbot_telegram=trace,meetbot_core=trace,meetbot_persistence=trace,teloxide=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = config::ensure_all_dirs() {
        tracing::warn!(error = %e, "Failed to create all directories");
    }

    let db_path = args.db.unwrap_or_else(config::db_file);
    let store = Arc::new(CalendarStore::open(&db_path)?);
    tracing::info!(path = %db_path.display(), "Database ready");

    let settings = Settings::from_env();
    let bot = MeetBot::new(store, settings)?;

    match bot.get_me().await {
        Ok(username) => {
            tracing::info!(username = %username, "Bot initialized successfully");
            println!("\nMeeting calendar bot");
            println!("   Bot: @{}", username);
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to get bot info");
            return Err(e.into());
        }
    }

    println!("\nOpen Telegram and send /start to begin");
    println!("   Press Ctrl+C to stop\n");

    bot.start_polling().await?;

    Ok(())
}
