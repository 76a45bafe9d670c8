//! fwedbot: a Telegram bot that relays coin addresses between group chats.
//!
//! Users register groups and forum topics, then build connections through a
//! button-driven wizard in their private chat. Text posted in a connection's
//! source is scanned for addresses and an alert is posted to its target.
//!
//! The handlers in [`handlers`] are transport-agnostic: they take an
//! [`AppState`] and a [`Sender`] and return [`reply::Reply`] values.
//! [`telegram`] adapts them to a teloxide `Dispatcher`.

pub mod error;
pub mod handlers;
pub mod reply;
pub mod steps;
pub mod telegram;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use fwed_core::{
  alert::DEFAULT_LINK_TEMPLATE,
  model::{ChatId, UserId},
  store::RelayStore,
};
use serde::Deserialize;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime bot configuration, deserialised from `config.toml` and `FWED_*`
/// environment variables.
#[derive(Deserialize, Clone, Debug)]
pub struct BotConfig {
  pub bot_token:     String,
  #[serde(default = "default_store_path")]
  pub store_path:    PathBuf,
  /// Trading link for each detected address; `{address}` is interpolated.
  #[serde(default = "default_link_template")]
  pub link_template: String,
}

fn default_store_path() -> PathBuf { PathBuf::from("fwedbot.db") }

fn default_link_template() -> String { DEFAULT_LINK_TEMPLATE.to_string() }

impl BotConfig {
  /// Reject settings the bot cannot start with.
  pub fn validate(&self) -> Result<(), Error> {
    if self.bot_token.trim().is_empty() {
      return Err(Error::Config("bot_token must not be empty".into()));
    }
    if !self.link_template.contains(fwed_core::alert::ADDRESS_PLACEHOLDER) {
      return Err(Error::Config(format!(
        "link_template must contain {}",
        fwed_core::alert::ADDRESS_PLACEHOLDER
      )));
    }
    Ok(())
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through every handler.
#[derive(Clone)]
pub struct AppState<S: RelayStore> {
  pub store:  Arc<S>,
  pub config: Arc<BotConfig>,
}

/// The user behind an interaction and the private chat replies go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sender {
  pub user_id: UserId,
  pub chat_id: ChatId,
}

#[cfg(test)]
mod tests;
