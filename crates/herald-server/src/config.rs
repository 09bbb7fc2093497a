//! Runtime server configuration, deserialised from `config.toml`.
//!
//! Every key can also be supplied through the environment with a `HERALD_`
//! prefix, e.g. `HERALD_PORT=8080` or `HERALD_MAILER__API_KEY=...`.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub host:                 String,
  pub port:                 u16,
  pub store_path:           PathBuf,
  /// Absolute base URL the per-recipient unsubscribe link is built from.
  pub unsubscribe_base_url: String,
  /// Must be at least 1: directory enumeration ends on a page shorter
  /// than this, which a zero-sized page can never be.
  #[serde(
    default = "default_directory_page_size",
    deserialize_with = "nonzero_page_size"
  )]
  pub directory_page_size:  u32,
  #[serde(default = "default_send_timeout_secs")]
  pub send_timeout_secs:    u64,
  /// Optional hard ceiling on resolved recipients per campaign.
  #[serde(default)]
  pub max_recipients:       Option<usize>,
  pub mailer:               MailerConfig,
  pub directory:            DirectoryConfig,
}

/// Outbound mail provider endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct MailerConfig {
  pub api_url: String,
  /// Bearer token; requests go unauthenticated when absent.
  pub api_key: Option<String>,
}

/// Registered-account directory endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
  pub api_url: String,
}

fn default_directory_page_size() -> u32 {
  100
}

fn default_send_timeout_secs() -> u64 {
  30
}

fn nonzero_page_size<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
  D: serde::Deserializer<'de>,
{
  let value = u32::deserialize(deserializer)?;
  if value == 0 {
    return Err(serde::de::Error::custom(
      "directory_page_size must be at least 1",
    ));
  }
  Ok(value)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(toml: &str) -> Result<ServerConfig, ::config::ConfigError> {
    ::config::Config::builder()
      .add_source(::config::File::from_str(toml, ::config::FileFormat::Toml))
      .build()?
      .try_deserialize()
  }

  /// A valid config with `extra` spliced in at the top level, ahead of
  /// the `[mailer]` and `[directory]` tables.
  fn base_toml(extra: &str) -> String {
    format!(
      r#"
      host = "127.0.0.1"
      port = 8080
      store_path = "/tmp/herald.db"
      unsubscribe_base_url = "https://shop.example.com"
      {extra}
      [mailer]
      api_url = "https://mail.example.com"
      [directory]
      api_url = "https://accounts.example.com"
      "#
    )
  }

  #[test]
  fn defaults_are_applied() {
    let cfg = parse(&base_toml("")).unwrap();
    assert_eq!(cfg.directory_page_size, 100);
    assert_eq!(cfg.send_timeout_secs, 30);
    assert_eq!(cfg.max_recipients, None);
  }

  #[test]
  fn zero_page_size_is_rejected() {
    assert!(parse(&base_toml("directory_page_size = 0")).is_err());
  }

  #[test]
  fn nonzero_page_size_is_accepted() {
    let cfg = parse(&base_toml("directory_page_size = 25")).unwrap();
    assert_eq!(cfg.directory_page_size, 25);
  }
}
