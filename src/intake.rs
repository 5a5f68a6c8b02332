use async_std::future;
use std::time::Duration;
use tide::log::{error, info};
use tide::StatusCode;

use crate::errors::MonitorError;
use crate::grantor::PermissionGrantor;
use crate::models::{MonitorForm, Schedule};
use crate::registrar::{orphaned, ScheduleRegistrar};
use crate::subscriptions::SubscriptionManager;

pub(crate) const SUCCESS_BODY: &str = "success";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct IntakeResponse {
  pub status: StatusCode,
  pub body: String,
}

/// Registration boundary: registrar, then grantor, then subscription.
#[derive(Clone)]
pub(crate) struct Intake {
  pub registrar: ScheduleRegistrar,
  pub grantor: PermissionGrantor,
  pub subscriptions: SubscriptionManager,
  pub checker_identity: String,
  pub topic: String,
  pub timeout: Duration,
}

impl Intake {
  /// Every failure maps to the same 500; the kind only shows in the logs and message.
  pub async fn handle(&self, raw_body: &str) -> IntakeResponse {
    let id = ScheduleRegistrar::new_schedule_id();
    let outcome = match future::timeout(self.timeout, self.register_as(&id, raw_body)).await {
      Ok(outcome) => outcome,
      Err(_) => Err(self.timed_out(&id).await),
    };
    self.respond(outcome)
  }

  /// Same as `handle`, for a body that could not be read at all.
  pub async fn handle_body<E: ToString>(&self, body: Result<String, E>) -> IntakeResponse {
    match body {
      Ok(raw_body) => self.handle(&raw_body).await,
      Err(e) => self.respond(Err(MonitorError::MalformedBody(e.to_string()))),
    }
  }

  async fn timed_out(&self, id: &str) -> MonitorError {
    let e = MonitorError::Timeout(self.timeout.as_secs());
    if self.registrar.exists(id).await {
      return orphaned(id, e);
    }
    e
  }

  fn respond(&self, outcome: Result<Schedule, MonitorError>) -> IntakeResponse {
    match outcome {
      Ok(_) => IntakeResponse {
        status: StatusCode::Created,
        body: SUCCESS_BODY.to_string(),
      },
      Err(e) => {
        error!("registration failed ({}): {}", e.kind(), e);
        IntakeResponse {
          status: StatusCode::InternalServerError,
          body: e.to_string(),
        }
      }
    }
  }

  #[cfg(test)]
  pub async fn register(&self, raw_body: &str) -> Result<Schedule, MonitorError> {
    self.register_as(&ScheduleRegistrar::new_schedule_id(), raw_body).await
  }

  /// Steps run strictly in order and nothing is rolled back: a failure after
  /// the schedule exists leaves it behind.
  async fn register_as(&self, id: &str, raw_body: &str) -> Result<Schedule, MonitorError> {
    let form = parse_body(raw_body)?;
    let schedule = self.registrar.register_as(id, form).await?;

    let grant = self
      .grantor
      .grant(&schedule.id, &self.checker_identity, &schedule.arn)
      .await
      .map_err(|e| orphaned(&schedule.id, e))?;

    let subscription = self
      .subscriptions
      .subscribe(&schedule.payload.email, &self.topic)
      .await
      .map_err(|e| orphaned(&schedule.id, e))?;

    info!(
      "registered {} ({}) target {} grant {} subscription {}",
      schedule.id, schedule.rate_expression, schedule.target.id, grant.statement_id, subscription.arn
    );
    Ok(schedule)
  }
}

fn parse_body(raw_body: &str) -> Result<MonitorForm, MonitorError> {
  if raw_body.trim().is_empty() {
    return Err(MonitorError::MalformedBody("No body".to_string()));
  }
  serde_json::from_str(raw_body).map_err(|e| MonitorError::MalformedBody(e.to_string()))
}
