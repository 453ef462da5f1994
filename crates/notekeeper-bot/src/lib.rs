//! # notekeeper-bot
//!
//! Telegram front-end for notekeeper: quick capture with `/new`, listing,
//! search, deadlines, and one-click web login links.
//!
//! The bot long-polls the Bot API ([`client::TelegramClient`]), hands every
//! update to its own task ([`dispatcher`]), and answers through
//! [`handlers::handle_message`], which works against any
//! [`notekeeper_core::Store`].

pub mod client;
pub mod commands;
pub mod conversation;
pub mod dispatcher;
pub mod handlers;
pub mod messages;
pub mod types;

pub use client::TelegramClient;
pub use dispatcher::{process_update, Dispatcher, UpdateQueue};
pub use handlers::{BotContext, Reply};
