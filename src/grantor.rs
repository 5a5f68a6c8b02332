use std::sync::Arc;

use crate::errors::MonitorError;
use crate::models::Grant;
use crate::permissions::{PermissionService, INVOKE_ACTION};

/// Issues the one grant letting a schedule's trigger invoke the checker.
#[derive(Clone)]
pub(crate) struct PermissionGrantor {
  permissions: Arc<dyn PermissionService>,
  principal: String,
}

impl PermissionGrantor {
  pub fn new(permissions: Arc<dyn PermissionService>, principal: &str) -> Self {
    PermissionGrantor {
      permissions,
      principal: principal.to_string(),
    }
  }

  pub async fn grant(
    &self,
    schedule_id: &str,
    checker_identity: &str,
    trigger_arn: &str,
  ) -> Result<Grant, MonitorError> {
    // statement id doubles as the schedule id, so a repeat fails instead of stacking
    let grant = Grant {
      statement_id: schedule_id.to_string(),
      principal: self.principal.clone(),
      action: INVOKE_ACTION.to_string(),
      resource: checker_identity.to_string(),
      source_arn: trigger_arn.to_string(),
    };
    self.permissions.add_permission(grant.clone()).await?;
    Ok(grant)
  }
}
