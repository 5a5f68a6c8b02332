use std::sync::Arc;

use crate::channel::NotificationChannel;
use crate::errors::MonitorError;
use crate::models::{FilterPolicy, Subscription};

const EMAIL_PROTOCOL: &str = "email";

#[derive(Clone)]
pub(crate) struct SubscriptionManager {
  channel: Arc<dyn NotificationChannel>,
}

impl SubscriptionManager {
  pub fn new(channel: Arc<dyn NotificationChannel>) -> Self {
    SubscriptionManager { channel }
  }

  /// Subscribes `endpoint` to events carrying its own email attribute.
  /// Repeated calls are not deduplicated; each one adds a subscription.
  pub async fn subscribe(&self, endpoint: &str, topic: &str) -> Result<Subscription, MonitorError> {
    self.channel
      .subscribe(topic, EMAIL_PROTOCOL, endpoint, FilterPolicy::for_email(endpoint))
      .await
  }
}
