use async_std::sync::RwLock;
use async_trait::async_trait;
use std::collections::HashMap;

use crate::errors::MonitorError;
use crate::models::Grant;

pub(crate) const INVOKE_ACTION: &str = "checker:Invoke";

#[async_trait]
pub(crate) trait PermissionService: Send + Sync {
  async fn add_permission(&self, grant: Grant) -> Result<(), MonitorError>;

  /// Whether `principal`, acting for `source_arn`, may invoke `resource`.
  async fn allows(&self, principal: &str, resource: &str, source_arn: &str) -> bool;
}

/// Resource policy of one invocable checker, keyed by statement id.
#[derive(Debug)]
pub(crate) struct LocalPermissions {
  resource: String,
  statements: RwLock<HashMap<String, Grant>>,
}

impl LocalPermissions {
  pub fn new(resource: &str) -> Self {
    LocalPermissions {
      resource: resource.to_string(),
      statements: RwLock::new(HashMap::new()),
    }
  }

  #[cfg(test)]
  pub async fn grants(&self) -> Vec<Grant> {
    let mut grants: Vec<Grant> = self.statements.read().await.values().cloned().collect();
    grants.sort_by(|x, y| x.statement_id.cmp(&y.statement_id));
    grants
  }
}

#[async_trait]
impl PermissionService for LocalPermissions {
  async fn add_permission(&self, grant: Grant) -> Result<(), MonitorError> {
    if grant.resource != self.resource {
      return Err(MonitorError::Grant {
        statement_id: grant.statement_id,
        reason: format!("resource {} not found", grant.resource),
      });
    }
    let mut statements = self.statements.write().await;
    if statements.contains_key(&grant.statement_id) {
      return Err(MonitorError::DuplicateGrant(grant.statement_id));
    }
    statements.insert(grant.statement_id.clone(), grant);
    Ok(())
  }

  async fn allows(&self, principal: &str, resource: &str, source_arn: &str) -> bool {
    self.statements.read().await.values().any(|g| {
      g.action == INVOKE_ACTION
        && g.principal == principal
        && g.resource == resource
        && g.source_arn == source_arn
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn grant(statement_id: &str, resource: &str) -> Grant {
    Grant {
      statement_id: statement_id.to_string(),
      principal: "triggers.local".to_string(),
      action: INVOKE_ACTION.to_string(),
      resource: resource.to_string(),
      source_arn: format!("local:triggers:rule/{}", statement_id),
    }
  }

  #[async_std::test]
  async fn repeated_statement_id_fails_loudly() {
    let permissions = LocalPermissions::new("checker");
    permissions.add_permission(grant("rule-1", "checker")).await.unwrap();
    let err = permissions.add_permission(grant("rule-1", "checker")).await.unwrap_err();
    assert_eq!(err.kind(), "duplicate_grant");
    assert_eq!(permissions.grants().await.len(), 1);
  }

  #[async_std::test]
  async fn grant_is_scoped_to_its_source() {
    let permissions = LocalPermissions::new("checker");
    permissions.add_permission(grant("rule-1", "checker")).await.unwrap();
    assert!(permissions.allows("triggers.local", "checker", "local:triggers:rule/rule-1").await);
    assert!(!permissions.allows("triggers.local", "checker", "local:triggers:rule/rule-2").await);
    assert!(!permissions.allows("someone.else", "checker", "local:triggers:rule/rule-1").await);
  }

  #[async_std::test]
  async fn unknown_resource_is_rejected() {
    let permissions = LocalPermissions::new("checker");
    let err = permissions.add_permission(grant("rule-1", "other")).await.unwrap_err();
    assert_eq!(err.kind(), "grant");
  }
}
