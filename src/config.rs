//! Runtime configuration loaded from the environment (and `.env` via dotenvy)

use serde::Serialize;
use std::env;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_LOG_FILTER: &str = "info";

/// ---------------------------------------------------------------------------
/// Context Strategy Flag
/// ---------------------------------------------------------------------------

/// How the check-in context should be read.
///
/// `Auto` probes the schema once at start-up; the other two pin the choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategySetting {
  #[default]
  Auto,
  Aggregate,
  Discrete,
}

impl std::str::FromStr for StrategySetting {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "auto" | "" => Ok(Self::Auto),
      "aggregate" => Ok(Self::Aggregate),
      "discrete" => Ok(Self::Discrete),
      other => Err(format!("Unknown context strategy: {}", other)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("Invalid value for {key}: {value}")]
  Invalid { key: String, value: String },
}

/// ---------------------------------------------------------------------------
/// App Config
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AppConfig {
  /// Overrides the default database location under the app data dir
  pub database_url: Option<String>,
  pub max_connections: u32,
  pub context_strategy: StrategySetting,
  pub log_filter: String,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      database_url: None,
      max_connections: DEFAULT_MAX_CONNECTIONS,
      context_strategy: StrategySetting::Auto,
      log_filter: DEFAULT_LOG_FILTER.to_string(),
    }
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    let database_url = env::var("SQUAD_DB_URL").ok().filter(|v| !v.trim().is_empty());

    let max_connections = match env::var("SQUAD_DB_MAX_CONNECTIONS") {
      Ok(raw) => raw
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ConfigError::Invalid {
          key: "SQUAD_DB_MAX_CONNECTIONS".into(),
          value: raw.clone(),
        })?,
      Err(_) => DEFAULT_MAX_CONNECTIONS,
    };

    let context_strategy = match env::var("SQUAD_CONTEXT_STRATEGY") {
      Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
        key: "SQUAD_CONTEXT_STRATEGY".into(),
        value: raw.clone(),
      })?,
      Err(_) => StrategySetting::Auto,
    };

    let log_filter = env::var("SQUAD_LOG")
      .or_else(|_| env::var("RUST_LOG"))
      .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

    Ok(Self {
      database_url,
      max_connections,
      context_strategy,
      log_filter,
    })
  }
}
