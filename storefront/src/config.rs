// storefront/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::fmt;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
  Text,
  Json,
}

impl LogFormat {
  pub fn parse(raw: &str) -> Option<Self> {
    match raw.trim().to_ascii_lowercase().as_str() {
      "" | "text" => Some(LogFormat::Text),
      "json" => Some(LogFormat::Json),
      _ => None,
    }
  }
}

#[derive(Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,

  pub webhook_secret: String,
  /// `None` runs against the in-memory processor.
  pub payment_api_key: Option<String>,
  pub payment_api_base: String,

  /// `None` runs against the in-memory commerce backend.
  pub commerce_api_url: Option<String>,
  pub commerce_access_token: String,

  pub backend_timeout: Duration,
  pub signature_tolerance: Duration,
  pub tag_recovery_window: Duration,

  pub log_format: LogFormat,
}

impl fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    const REDACTED: &str = "[REDACTED]";
    f.debug_struct("AppConfig")
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("webhook_secret", &REDACTED)
      .field("payment_api_key", &self.payment_api_key.as_ref().map(|_| REDACTED))
      .field("payment_api_base", &self.payment_api_base)
      .field("commerce_api_url", &self.commerce_api_url)
      .field("commerce_access_token", &REDACTED)
      .field("backend_timeout", &self.backend_timeout)
      .field("signature_tolerance", &self.signature_tolerance)
      .field("tag_recovery_window", &self.tag_recovery_window)
      .field("log_format", &self.log_format)
      .finish()
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any variable source. `from_env` passes the process
  /// environment; tests pass a map.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |var_name: &str| {
      lookup(var_name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)))
    };
    let get_secs = |var_name: &str, default: u64| -> Result<Duration> {
      match lookup(var_name).filter(|v| !v.trim().is_empty()) {
        None => Ok(Duration::from_secs(default)),
        Some(raw) => raw
          .trim()
          .parse::<u64>()
          .map(Duration::from_secs)
          .map_err(|e| AppError::Config(format!("Invalid {}: {}", var_name, e))),
      }
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;

    let webhook_secret = get_env("PAYMENT_WEBHOOK_SECRET")?;
    let payment_api_key = get_env("PAYMENT_API_KEY").ok();
    let payment_api_base = get_env("PAYMENT_API_BASE").unwrap_or_else(|_| "https://api.stripe.com".to_string());

    let commerce_api_url = get_env("COMMERCE_API_URL").ok();
    let commerce_access_token = get_env("COMMERCE_ACCESS_TOKEN").unwrap_or_default();

    let backend_timeout = get_secs("BACKEND_TIMEOUT_SECS", 10)?;
    let signature_tolerance = get_secs("SIGNATURE_TOLERANCE_SECS", 300)?;
    let tag_recovery_window = get_secs("TAG_RECOVERY_WINDOW_SECS", 3600)?;

    let raw_format = get_env("LOG_FORMAT").unwrap_or_default();
    let log_format = LogFormat::parse(&raw_format)
      .ok_or_else(|| AppError::Config(format!("Invalid LOG_FORMAT: '{}'", raw_format)))?;

    let config = Self {
      server_host,
      server_port,
      webhook_secret,
      payment_api_key,
      payment_api_base,
      commerce_api_url,
      commerce_access_token,
      backend_timeout,
      signature_tolerance,
      tag_recovery_window,
      log_format,
    };
    tracing::info!(config = ?config, "Application configuration loaded successfully.");
    Ok(config)
  }
}
