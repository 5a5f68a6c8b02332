use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FieldError {
  pub field: &'static str,
  pub reason: String,
}

impl FieldError {
  pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
    FieldError { field, reason: reason.into() }
  }
}

impl fmt::Display for FieldError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.field, self.reason)
  }
}

/// Every field that failed validation, in field order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
  #[cfg(test)]
  pub fn fields(&self) -> Vec<&'static str> {
    self.0.iter().map(|e| e.field).collect()
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let reasons: Vec<String> = self.0.iter().map(ToString::to_string).collect();
    write!(f, "{}", reasons.join("; "))
  }
}

#[derive(Error, Debug)]
pub(crate) enum MonitorError {
  #[error("invalid body: {0}")]
  Validation(ValidationErrors),
  #[error("{0}")]
  MalformedBody(String),
  #[error("Missing Env var: {0}")]
  Configuration(String),
  #[error("Failed to fetch url {url}: {reason}")]
  Fetch { url: String, reason: String },
  #[error("Failed to publish change event: {0}")]
  Publish(String),
  #[error("Failed to register schedule {name}: {reason}")]
  Trigger { name: String, reason: String },
  #[error("Failed to attach target to schedule {name}: {reason}")]
  Target { name: String, reason: String },
  #[error("Failed to grant invocation for {statement_id}: {reason}")]
  Grant { statement_id: String, reason: String },
  #[error("Grant {0} already exists")]
  DuplicateGrant(String),
  #[error("Failed to subscribe {endpoint}: {reason}")]
  Subscription { endpoint: String, reason: String },
  #[error("Registration timed out after {0}s")]
  Timeout(u64),
}

impl MonitorError {
  pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
    MonitorError::Fetch { url: url.into(), reason: reason.to_string() }
  }

  pub fn kind(&self) -> &'static str {
    match self {
      MonitorError::Validation(_) | MonitorError::MalformedBody(_) => "validation",
      MonitorError::Configuration(_) => "configuration",
      MonitorError::Fetch { .. } => "fetch",
      MonitorError::Publish(_) => "publish",
      MonitorError::Trigger { .. } => "trigger",
      MonitorError::Target { .. } => "target",
      MonitorError::Grant { .. } => "grant",
      MonitorError::DuplicateGrant(_) => "duplicate_grant",
      MonitorError::Subscription { .. } => "subscription",
      MonitorError::Timeout(_) => "timeout",
    }
  }
}

impl From<ValidationErrors> for MonitorError {
  fn from(errors: ValidationErrors) -> Self {
    MonitorError::Validation(errors)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn validation_message_lists_every_field() {
    let err = MonitorError::from(ValidationErrors(vec![
      FieldError::new("email", "is missing"),
      FieldError::new("intervalUnit", "must match multiplicity (singular/plural) of intervalValue"),
    ]));
    assert_eq!(
      err.to_string(),
      "invalid body: email is missing; intervalUnit must match multiplicity (singular/plural) of intervalValue"
    );
    assert_eq!(err.kind(), "validation");
  }

  #[test]
  fn duplicate_grant_is_its_own_kind() {
    let err = MonitorError::DuplicateGrant("webpage-monitor-rule-1".to_string());
    assert_eq!(err.kind(), "duplicate_grant");
    assert_eq!(err.to_string(), "Grant webpage-monitor-rule-1 already exists");
  }
}
