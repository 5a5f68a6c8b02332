use std::env;
use std::time::Duration;

use crate::errors::MonitorError;

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_TRIGGER_PRINCIPAL: &str = "triggers.local";
const DEFAULT_INTAKE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Config {
  pub listen_addr: String,
  /// Notification channel every change event is published to.
  pub topic_id: String,
  /// Name grants are issued against.
  pub checker_identity: String,
  /// Where schedule targets deliver their payload.
  pub checker_address: String,
  pub trigger_principal: String,
  pub intake_timeout: Duration,
  pub fetch_timeout: Duration,
}

impl Config {
  pub fn from_env() -> Result<Self, MonitorError> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  pub fn from_lookup<F>(lookup: F) -> Result<Self, MonitorError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let required = ["MONITOR_TOPIC_ID", "CHECKER_IDENTITY", "CHECKER_ADDRESS"];
    let missing: Vec<&str> = required
      .iter()
      .copied()
      .filter(|key| value(*key).is_none())
      .collect();
    if !missing.is_empty() {
      return Err(MonitorError::Configuration(missing.join(", ")));
    }

    Ok(Config {
      listen_addr: value("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
      topic_id: value("MONITOR_TOPIC_ID").unwrap_or_default(),
      checker_identity: value("CHECKER_IDENTITY").unwrap_or_default(),
      checker_address: value("CHECKER_ADDRESS").unwrap_or_default(),
      trigger_principal: value("TRIGGER_PRINCIPAL")
        .unwrap_or_else(|| DEFAULT_TRIGGER_PRINCIPAL.to_string()),
      intake_timeout: seconds(value("INTAKE_TIMEOUT_SECS"), DEFAULT_INTAKE_TIMEOUT_SECS, "INTAKE_TIMEOUT_SECS")?,
      fetch_timeout: seconds(value("FETCH_TIMEOUT_SECS"), DEFAULT_FETCH_TIMEOUT_SECS, "FETCH_TIMEOUT_SECS")?,
    })
  }
}

fn seconds(raw: Option<String>, default: u64, key: &str) -> Result<Duration, MonitorError> {
  match raw {
    None => Ok(Duration::from_secs(default)),
    Some(raw) => raw
      .trim()
      .parse::<u64>()
      .ok()
      .filter(|secs| *secs > 0)
      .map(Duration::from_secs)
      .ok_or_else(|| MonitorError::Configuration(format!("{} must be a positive number of seconds", key))),
  }
}
