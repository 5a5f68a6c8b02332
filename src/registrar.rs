use std::sync::Arc;
use tide::log::warn;
use uuid::Uuid;

use crate::errors::MonitorError;
use crate::models::{MonitorForm, Rule, Schedule, Target};
use crate::triggers::TriggerService;
use crate::validation::validate;

pub(crate) const SCHEDULE_PREFIX: &str = "webpage-monitor-rule";

/// Turns a monitor form into a recurring schedule that targets the checker.
#[derive(Clone)]
pub(crate) struct ScheduleRegistrar {
  triggers: Arc<dyn TriggerService>,
  checker_address: String,
}

impl ScheduleRegistrar {
  pub fn new(triggers: Arc<dyn TriggerService>, checker_address: &str) -> Self {
    ScheduleRegistrar {
      triggers,
      checker_address: checker_address.to_string(),
    }
  }

  pub fn new_schedule_id() -> String {
    format!("{}-{}", SCHEDULE_PREFIX, Uuid::new_v4())
  }

  #[cfg(test)]
  pub async fn register(&self, form: MonitorForm) -> Result<Schedule, MonitorError> {
    self.register_as(&Self::new_schedule_id(), form).await
  }

  /// Nothing is created unless the whole form validates. A failure while
  /// attaching the target leaves the rule in place.
  pub async fn register_as(&self, id: &str, form: MonitorForm) -> Result<Schedule, MonitorError> {
    let request = validate(form)?;

    let id = id.to_string();
    let rule = Rule {
      name: id.clone(),
      schedule_expression: request.interval.rate_expression(),
      description: request.hostname(),
    };
    let arn = self.triggers.put_rule(rule.clone()).await?;

    // interval fields stay out of the payload; a single check has no use for them
    let payload = request.check_input();
    let input = serde_json::to_string(&payload).map_err(|e| MonitorError::Target {
      name: id.clone(),
      reason: e.to_string(),
    })?;
    let target = Target {
      id: format!("{}-target", id),
      address: self.checker_address.clone(),
      input,
    };
    self
      .triggers
      .put_targets(&id, target.clone())
      .await
      .map_err(|e| orphaned(&id, e))?;

    Ok(Schedule {
      id,
      arn,
      rate_expression: rule.schedule_expression,
      description: rule.description,
      target,
      payload,
    })
  }

  /// Whether a rule was already created under `id`.
  pub async fn exists(&self, id: &str) -> bool {
    self.triggers.describe_rule(id).await.is_some()
  }
}

/// Logs a schedule whose registration stopped partway; nothing is rolled back.
pub(crate) fn orphaned(id: &str, e: MonitorError) -> MonitorError {
  warn!("schedule {} left without full registration: {}", id, e);
  e
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::Target;
  use crate::triggers::LocalTriggers;
  use async_trait::async_trait;
  use serde_json::Value;

  /// Records rules but refuses every target.
  struct TargetlessTriggers(LocalTriggers);

  #[async_trait]
  impl TriggerService for TargetlessTriggers {
    async fn put_rule(&self, rule: Rule) -> Result<String, MonitorError> {
      self.0.put_rule(rule).await
    }

    async fn put_targets(&self, rule_name: &str, _target: Target) -> Result<(), MonitorError> {
      Err(MonitorError::Target {
        name: rule_name.to_string(),
        reason: "throttled".to_string(),
      })
    }

    async fn describe_rule(&self, rule_name: &str) -> Option<String> {
      self.0.describe_rule(rule_name).await
    }
  }

  fn form(value: i64, unit: &str) -> MonitorForm {
    MonitorForm {
      email: Some("a@x.com".to_string()),
      url: Some("https://example.com/status".to_string()),
      watch_phrase: Some("Example Domain".to_string()),
      interval_value: Some(value),
      interval_unit: Some(unit.to_string()),
    }
  }

  fn registrar(triggers: Arc<LocalTriggers>) -> ScheduleRegistrar {
    ScheduleRegistrar::new(triggers, "http://127.0.0.1:8080/check")
  }

  #[async_std::test]
  async fn rate_expression_follows_the_request() {
    let triggers = Arc::new(LocalTriggers::detached());
    let schedule = registrar(triggers.clone()).register(form(3, "hours")).await.unwrap();
    assert_eq!(schedule.rate_expression, "rate(3 hours)");
    assert_eq!(schedule.description, "example.com");
    assert!(schedule.id.starts_with("webpage-monitor-rule-"));

    let registered = triggers.registered().await;
    assert_eq!(registered.len(), 1);
    assert_eq!(registered[0].rule.schedule_expression, "rate(3 hours)");
    assert_eq!(registered[0].arn, schedule.arn);
  }

  #[async_std::test]
  async fn target_payload_carries_only_check_fields() {
    let triggers = Arc::new(LocalTriggers::detached());
    let schedule = registrar(triggers).register(form(1, "day")).await.unwrap();
    assert_eq!(schedule.target.id, format!("{}-target", schedule.id));
    assert_eq!(schedule.target.address, "http://127.0.0.1:8080/check");

    let input: Value = serde_json::from_str(&schedule.target.input).unwrap();
    let mut keys: Vec<&str> = input.as_object().unwrap().keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(keys, vec!["email", "url", "watchPhrase"]);
  }

  #[async_std::test]
  async fn identical_requests_get_distinct_ids() {
    let triggers = Arc::new(LocalTriggers::detached());
    let registrar = registrar(triggers.clone());
    let first = registrar.register(form(5, "minutes")).await.unwrap();
    let second = registrar.register(form(5, "minutes")).await.unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(triggers.registered().await.len(), 2);
  }

  #[async_std::test]
  async fn failed_target_leaves_the_rule_behind() {
    let triggers = Arc::new(TargetlessTriggers(LocalTriggers::detached()));
    let registrar = ScheduleRegistrar::new(triggers.clone(), "http://127.0.0.1:8080/check");
    let id = ScheduleRegistrar::new_schedule_id();

    let err = registrar.register_as(&id, form(5, "minutes")).await.unwrap_err();
    assert_eq!(err.kind(), "target");
    assert!(registrar.exists(&id).await);
    assert_eq!(triggers.0.registered().await[0].target, None);
  }

  #[async_std::test]
  async fn invalid_request_creates_nothing() {
    let triggers = Arc::new(LocalTriggers::detached());
    let err = registrar(triggers.clone()).register(form(1, "minutes")).await.unwrap_err();
    assert_eq!(err.kind(), "validation");
    assert!(triggers.registered().await.is_empty());
  }
}
