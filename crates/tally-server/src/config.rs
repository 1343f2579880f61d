//! Server configuration: a TOML file overlaid with `TALLY_*` environment
//! variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::FixedOffset;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub store_path:          PathBuf,
  /// UTC offset such as `+05:30`. Decides which calendar day a sighting is
  /// filed under and how windows align.
  pub timezone:            String,
  pub admin_username:      String,
  /// PHC string produced by `tally --hash-password`.
  pub admin_password_hash: String,
}

impl ServerConfig {
  /// Read `path` (optional) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = ::config::Config::builder()
      .set_default("host", "127.0.0.1")?
      .set_default("port", 8080)?
      .set_default("store_path", "~/.local/share/tally/tally.db")?
      .set_default("timezone", "+00:00")?
      .add_source(::config::File::from(path).required(false))
      .add_source(::config::Environment::with_prefix("TALLY"))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn offset(&self) -> anyhow::Result<FixedOffset> {
    self
      .timezone
      .parse::<FixedOffset>()
      .with_context(|| format!("invalid timezone offset {:?}", self.timezone))
  }

  /// `store_path` with a leading `~` expanded to the user's home directory.
  pub fn resolved_store_path(&self) -> PathBuf {
    expand_tilde(&self.store_path)
  }
}

fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
