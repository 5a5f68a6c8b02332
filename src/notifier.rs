use std::sync::Arc;
use tide::log::info;

use crate::channel::NotificationChannel;
use crate::errors::MonitorError;
use crate::models::ChangeEvent;

/// Publishes change events on the shared topic, routed by recipient email.
#[derive(Clone)]
pub(crate) struct Notifier {
  channel: Arc<dyn NotificationChannel>,
  topic: String,
}

impl Notifier {
  pub fn new(channel: Arc<dyn NotificationChannel>, topic: &str) -> Self {
    Notifier { channel, topic: topic.to_string() }
  }

  pub async fn publish(&self, event: &ChangeEvent) -> Result<String, MonitorError> {
    let message_id = self.channel.publish(&self.topic, event.to_message()).await?;
    info!("published {} to {} for {}", message_id, self.topic, event.url);
    Ok(message_id)
  }
}
