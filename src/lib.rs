//! Chat-driven Python environment manager: package registry, import-based
//! dependency reconciliation and bounded script execution behind a Telegram bot.

pub mod bot;
pub mod cli;
pub mod config;
pub mod execution;
pub mod imports;
pub mod printer;
pub mod process;
pub mod reconcile;
pub mod registry;
pub mod telegram;
