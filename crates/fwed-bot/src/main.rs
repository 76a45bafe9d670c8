//! fwedbot binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `FWED_*` environment variables, opens the SQLite store and polls Telegram
//! for updates until interrupted.
//!
//! ```
//! FWED_BOT_TOKEN=123:abc fwedbot --config /etc/fwedbot/config.toml
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use fwed_bot::{AppState, BotConfig, telegram};
use fwed_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "fwedbot address relay")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("FWED"))
    .build()
    .context("failed to read config file")?;

  let mut bot_cfg: BotConfig = settings
    .try_deserialize()
    .context("failed to deserialise BotConfig")?;
  bot_cfg.validate()?;

  bot_cfg.store_path = expand_tilde(&bot_cfg.store_path);

  let store = SqliteStore::open(&bot_cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", bot_cfg.store_path))?;
  tracing::info!(store_path = ?bot_cfg.store_path, "store opened");

  let state = AppState {
    store:  Arc::new(store),
    config: Arc::new(bot_cfg),
  };

  telegram::run(state).await;
  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
