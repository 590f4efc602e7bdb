//! Porter - A LINE bot relaying messages to the groups it belongs to.
//!
//! Porter receives the LINE webhook events, lets users authenticate with a
//! shared password, and relays the one-to-one messages of authenticated users
//! to every group chat the bot has joined.
//!
//! # Authentication
//!
//! A user authenticates by sending the trigger phrase to the bot, then the
//! password in the next message:
//!
//! ```text
//! user: knock knock open the door
//! bot:  Please enter the password.
//! user: <password>
//! bot:  You are now authenticated. Welcome!
//! ```
//!
//! A wrong password ends the attempt, the trigger phrase has to be sent again.
//! Any other message from an unauthenticated user is ignored.
//!
//! # Usage
//!
//! ```bash
//! porter --config config.yaml --data ./porter-data
//! ```
//!
//! See the [`config`] module for the configuration file format and the
//! environment variables.
//!
//! # Architecture
//!
//! - [`access`] - Authentication records, password windows and user state
//! - [`bot`] - Webhook HTTP server
//! - [`config`] - YAML configuration with environment variable overrides
//! - [`line`] - LINE Messaging API client, webhook structures and signatures
//! - [`relay`] - Fan-out of messages to the groups
//! - [`roster`] - Groups the bot belongs to
//! - [`router`] - Dispatch of the webhook events
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (default: `info`)

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use crate::{bot::Bot, config::Config};

mod access;
mod bot;
mod config;
mod line;
mod relay;
mod roster;
mod router;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file.
    ///
    /// The file is optional when the environment provides every required value.
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Path to the directory for storing persistent data.
    ///
    /// This directory will contain:
    /// - `group_id.txt` - Groups the bot belongs to, one per line
    /// - `authenticated_users.json` - Users who entered the password
    #[arg(short, long, default_value = ".")]
    data: String,
}

#[tokio::main]
async fn main() {
    // Put logger at info level by default
    let env = Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    info!("Starting porter {}...", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load config: {:#}", e);
            return;
        }
    };

    let bot = match Bot::new(config, &args.data).await {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to initialize bot: {:#}", e);
            return;
        }
    };

    if let Err(e) = bot.start().await {
        error!("Server error: {:#}", e);
    }
}
