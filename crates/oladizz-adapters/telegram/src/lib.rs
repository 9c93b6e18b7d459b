//! # Oladizz Adapter for the Telegram Bot API
//!
//! Connects the conversation engine to Telegram over plain HTTPS:
//!
//! - [`LongPolling`] receives updates through `getUpdates` and normalizes
//!   them into [`InboundEvent`](oladizz_core::InboundEvent)s
//! - [`TelegramBot`] implements [`Outbound`](oladizz_core::Outbound) for
//!   messages, edits, uploads and downloads
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use oladizz_adapter_telegram::{LongPolling, TelegramBot, TelegramSettings};
//!
//! let settings = TelegramSettings::new(token);
//! let bot = TelegramBot::new(&settings)?;
//! let source = LongPolling::new(bot.caller(), &settings);
//! runtime.run(engine, Arc::new(source)).await?;
//! ```

pub mod api_caller;
pub mod bot;
pub mod config;
pub mod model;
pub mod polling;

pub use api_caller::ApiCaller;
pub use bot::{MAX_MESSAGE_CHARS, TelegramBot, split_message};
pub use config::TelegramSettings;
pub use polling::{ALLOWED_UPDATES, LongPolling};
