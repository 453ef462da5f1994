//! # notekeeper-core
//!
//! Core types, traits, and abstractions for notekeeper.
//!
//! This crate provides the domain model (accounts, notes, categories, tags),
//! the owner-scoped repository traits every storage backend implements, and
//! the ambient pieces shared by the web server and the chat bot: the error
//! type, environment configuration, and the structured logging schema.

pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod temporal;
pub mod traits;
pub mod validation;

// Re-export commonly used types at crate root
pub use config::{RateLimitSettings, Settings, TelegramSettings};
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
