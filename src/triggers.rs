use async_std::sync::RwLock;
use async_std::{task, task::JoinHandle};
use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tide::log::{error, info, warn};

use crate::errors::MonitorError;
use crate::models::{Interval, Rule, Target};
use crate::permissions::PermissionService;

const RULE_ARN_PREFIX: &str = "local:triggers:rule/";

/// Recurring trigger service: named rules firing one target on a rate.
#[async_trait]
pub(crate) trait TriggerService: Send + Sync {
  /// Creates or updates a rule and returns its arn.
  async fn put_rule(&self, rule: Rule) -> Result<String, MonitorError>;

  async fn put_targets(&self, rule_name: &str, target: Target) -> Result<(), MonitorError>;

  /// Arn of the named rule, if it exists.
  async fn describe_rule(&self, rule_name: &str) -> Option<String>;
}

/// Delivers a target's frozen input to its address.
#[async_trait]
pub(crate) trait TargetInvoker: Send + Sync {
  /// Returns the status the target answered with.
  async fn invoke(&self, target: &Target) -> Result<u16, String>;
}

/// POSTs the target input as JSON.
pub(crate) struct HttpInvoker;

#[async_trait]
impl TargetInvoker for HttpInvoker {
  async fn invoke(&self, target: &Target) -> Result<u16, String> {
    let payload: Value = serde_json::from_str(&target.input).map_err(|e| e.to_string())?;
    let request = surf::post(&target.address)
      .body_json(&payload)
      .map_err(|e| e.to_string())?;
    let response = request.await.map_err(|e| e.to_string())?;
    Ok(response.status().as_u16())
  }
}

/// Invokes a rule's target on behalf of the trigger principal.
pub(crate) struct Dispatcher {
  permissions: Arc<dyn PermissionService>,
  invoker: Arc<dyn TargetInvoker>,
  principal: String,
  resource: String,
}

impl Dispatcher {
  pub fn new(
    permissions: Arc<dyn PermissionService>,
    invoker: Arc<dyn TargetInvoker>,
    principal: &str,
    resource: &str,
  ) -> Self {
    Dispatcher {
      permissions,
      invoker,
      principal: principal.to_string(),
      resource: resource.to_string(),
    }
  }

  /// Whether a grant lets this principal invoke the resource for `rule_arn`.
  pub async fn permitted(&self, rule_arn: &str) -> bool {
    self.permissions.allows(&self.principal, &self.resource, rule_arn).await
  }

  /// Returns whether the target was invoked.
  pub async fn fire(&self, rule_arn: &str, target: &Target) -> bool {
    if !self.permitted(rule_arn).await {
      warn!("{} may not invoke {} for {}, skipping", self.principal, self.resource, rule_arn);
      return false;
    }
    match self.invoker.invoke(target).await {
      Ok(status) => info!("{} fired {} ({})", rule_arn, target.id, status),
      Err(reason) => error!("{} failed to fire {}: {}", rule_arn, target.id, reason),
    }
    true
  }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub(crate) struct RegisteredRule {
  pub rule: Rule,
  pub arn: String,
  pub target: Option<Target>,
}

struct Registration {
  rule: Rule,
  arn: String,
  interval: Interval,
  target: Option<Target>,
  worker: Option<JoinHandle<()>>,
}

/// In-process trigger service. Without a dispatcher rules are only recorded.
pub(crate) struct LocalTriggers {
  rules: RwLock<HashMap<String, Registration>>,
  dispatcher: Option<Arc<Dispatcher>>,
}

impl LocalTriggers {
  #[cfg(test)]
  pub fn detached() -> Self {
    LocalTriggers {
      rules: RwLock::new(HashMap::new()),
      dispatcher: None,
    }
  }

  pub fn with_dispatcher(dispatcher: Arc<Dispatcher>) -> Self {
    LocalTriggers {
      rules: RwLock::new(HashMap::new()),
      dispatcher: Some(dispatcher),
    }
  }

  pub async fn registered(&self) -> Vec<RegisteredRule> {
    let mut rules: Vec<RegisteredRule> = self.rules
      .read()
      .await
      .values()
      .map(|r| RegisteredRule {
        rule: r.rule.clone(),
        arn: r.arn.clone(),
        target: r.target.clone(),
      })
      .collect();
    rules.sort_by(|x, y| x.rule.name.cmp(&y.rule.name));
    rules
  }

  pub async fn stop(&self) {
    let workers: Vec<JoinHandle<()>> = self.rules
      .write()
      .await
      .values_mut()
      .filter_map(|r| r.worker.take())
      .collect();
    join_all(workers.into_iter().map(|w| w.cancel())).await;
  }

  #[cfg(test)]
  pub async fn running_workers(&self) -> usize {
    self.rules.read().await.values().filter(|r| r.worker.is_some()).count()
  }
}

#[async_trait]
impl TriggerService for LocalTriggers {
  async fn put_rule(&self, rule: Rule) -> Result<String, MonitorError> {
    let interval = Interval::from_rate_expression(&rule.schedule_expression)
      .ok_or_else(|| MonitorError::Trigger {
        name: rule.name.clone(),
        reason: format!("invalid schedule expression {}", rule.schedule_expression),
      })?;

    let mut rules = self.rules.write().await;
    let arn = format!("{}{}", RULE_ARN_PREFIX, rule.name);
    match rules.get_mut(&rule.name) {
      Some(existing) => {
        existing.rule = rule;
        existing.interval = interval;
      }
      None => {
        rules.insert(rule.name.clone(), Registration {
          rule,
          arn: arn.clone(),
          interval,
          target: None,
          worker: None,
        });
      }
    }
    Ok(arn)
  }

  async fn put_targets(&self, rule_name: &str, target: Target) -> Result<(), MonitorError> {
    let mut rules = self.rules.write().await;
    let registration = rules.get_mut(rule_name).ok_or_else(|| MonitorError::Target {
      name: rule_name.to_string(),
      reason: "rule not found".to_string(),
    })?;

    // one target per rule: replace it along with its worker
    if let Some(previous) = registration.worker.take() {
      task::spawn(async move {
        previous.cancel().await;
      });
    }
    if let Some(dispatcher) = &self.dispatcher {
      registration.worker = Some(spawn_worker(
        dispatcher.clone(),
        registration.arn.clone(),
        registration.interval.period(),
        target.clone(),
      ));
    }
    registration.target = Some(target);
    Ok(())
  }

  async fn describe_rule(&self, rule_name: &str) -> Option<String> {
    self.rules.read().await.get(rule_name).map(|r| r.arn.clone())
  }
}

fn spawn_worker(
  dispatcher: Arc<Dispatcher>,
  rule_arn: String,
  period: Duration,
  target: Target,
) -> JoinHandle<()> {
  task::spawn(async move {
    // firings of one rule run back to back, never overlapping
    loop {
      task::sleep(period).await;
      dispatcher.fire(&rule_arn, &target).await;
    }
  })
}
