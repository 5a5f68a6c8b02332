use async_std::sync::RwLock;
use async_trait::async_trait;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::collections::HashMap;
use tide::log::{info, warn};
use uuid::Uuid;

use crate::errors::MonitorError;
use crate::models::{Delivery, FilterPolicy, Message, Subscription};

/// Deliveries kept per subscription until drained; the oldest go first.
pub(crate) const MAILBOX_CAPACITY: usize = 100;

/// Fan-out notification channel.
#[async_trait]
pub(crate) trait NotificationChannel: Send + Sync {
  /// Hands the message to the topic and returns its message id.
  async fn publish(&self, topic: &str, message: Message) -> Result<String, MonitorError>;

  async fn subscribe(
    &self,
    topic: &str,
    protocol: &str,
    endpoint: &str,
    filter_policy: FilterPolicy,
  ) -> Result<Subscription, MonitorError>;
}

#[derive(Debug)]
struct Mailbox {
  subscription: Subscription,
  sender: Sender<Delivery>,
  receiver: Receiver<Delivery>,
}

impl Mailbox {
  fn push(&self, mut delivery: Delivery) -> Result<(), MonitorError> {
    loop {
      match self.sender.try_send(delivery) {
        Ok(()) => return Ok(()),
        Err(TrySendError::Full(back)) => {
          if let Ok(dropped) = self.receiver.try_recv() {
            warn!("mailbox of {} is full, dropping {}", self.subscription.endpoint, dropped.message_id);
          }
          delivery = back;
        }
        Err(TrySendError::Disconnected(_)) => {
          return Err(MonitorError::Publish(format!(
            "mailbox of {} is closed",
            self.subscription.endpoint
          )));
        }
      }
    }
  }
}

/// In-process channel; each subscription queues its deliveries in a mailbox.
#[derive(Debug)]
pub(crate) struct LocalChannel {
  topics: RwLock<HashMap<String, Vec<Mailbox>>>,
  capacity: usize,
}

impl Default for LocalChannel {
  fn default() -> Self {
    LocalChannel {
      topics: RwLock::new(HashMap::new()),
      capacity: MAILBOX_CAPACITY,
    }
  }
}

impl LocalChannel {
  pub fn with_topic(topic: &str) -> Self {
    Self::with_capacity(topic, MAILBOX_CAPACITY)
  }

  pub fn with_capacity(topic: &str, capacity: usize) -> Self {
    let mut topics = HashMap::new();
    topics.insert(topic.to_string(), Vec::new());
    LocalChannel {
      topics: RwLock::new(topics),
      capacity: capacity.max(1),
    }
  }

  #[cfg(test)]
  pub async fn subscriptions(&self, topic: &str) -> Vec<Subscription> {
    self.topics
      .read()
      .await
      .get(topic)
      .map(|boxes| boxes.iter().map(|b| b.subscription.clone()).collect())
      .unwrap_or_default()
  }

  /// Takes everything queued for `endpoint`, across all its subscriptions.
  pub async fn drain(&self, endpoint: &str) -> Vec<Delivery> {
    self.topics
      .read()
      .await
      .values()
      .flatten()
      .filter(|b| b.subscription.endpoint == endpoint)
      .flat_map(|b| b.receiver.try_iter().collect::<Vec<_>>())
      .collect()
  }
}

#[async_trait]
impl NotificationChannel for LocalChannel {
  async fn publish(&self, topic: &str, message: Message) -> Result<String, MonitorError> {
    let topics = self.topics.read().await;
    let mailboxes = topics
      .get(topic)
      .ok_or_else(|| MonitorError::Publish(format!("topic {} not found", topic)))?;

    let message_id = Uuid::new_v4().to_string();
    for mailbox in mailboxes
      .iter()
      .filter(|b| b.subscription.filter_policy.matches(&message.attributes))
    {
      let delivery = Delivery {
        message_id: message_id.clone(),
        subscription_arn: mailbox.subscription.arn.clone(),
        endpoint: mailbox.subscription.endpoint.clone(),
        subject: message.subject.clone(),
        body: message.body.clone(),
      };
      info!("delivering {} to {} via {}", message_id, delivery.endpoint, mailbox.subscription.protocol);
      mailbox.push(delivery)?;
    }
    Ok(message_id)
  }

  async fn subscribe(
    &self,
    topic: &str,
    protocol: &str,
    endpoint: &str,
    filter_policy: FilterPolicy,
  ) -> Result<Subscription, MonitorError> {
    let mut topics = self.topics.write().await;
    let mailboxes = topics.get_mut(topic).ok_or_else(|| MonitorError::Subscription {
      endpoint: endpoint.to_string(),
      reason: format!("topic {} not found", topic),
    })?;

    let subscription = Subscription {
      arn: format!("{}:{}", topic, Uuid::new_v4()),
      protocol: protocol.to_string(),
      endpoint: endpoint.to_string(),
      filter_policy,
    };
    let (sender, receiver) = bounded(self.capacity);
    mailboxes.push(Mailbox { subscription: subscription.clone(), sender, receiver });
    Ok(subscription)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn message_for(email: &str) -> Message {
    let mut attributes = HashMap::new();
    attributes.insert("email".to_string(), email.to_string());
    Message {
      subject: "Webpage example.com changed".to_string(),
      body: "changed".to_string(),
      attributes,
    }
  }

  #[async_std::test]
  async fn delivers_only_to_matching_filter() {
    let channel = LocalChannel::with_topic("changes");
    channel.subscribe("changes", "email", "a@x.com", FilterPolicy::for_email("a@x.com")).await.unwrap();
    channel.subscribe("changes", "email", "b@x.com", FilterPolicy::for_email("b@x.com")).await.unwrap();

    channel.publish("changes", message_for("a@x.com")).await.unwrap();

    let delivered = channel.drain("a@x.com").await;
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].subject, "Webpage example.com changed");
    assert!(channel.drain("b@x.com").await.is_empty());
  }

  #[async_std::test]
  async fn unknown_topic_fails() {
    let channel = LocalChannel::with_topic("changes");
    let err = channel.publish("other", message_for("a@x.com")).await.unwrap_err();
    assert_eq!(err.kind(), "publish");
    let err = channel
      .subscribe("other", "email", "a@x.com", FilterPolicy::for_email("a@x.com"))
      .await
      .unwrap_err();
    assert_eq!(err.kind(), "subscription");
  }

  #[async_std::test]
  async fn full_mailbox_drops_the_oldest_delivery() {
    let channel = LocalChannel::with_capacity("changes", 2);
    channel.subscribe("changes", "email", "a@x.com", FilterPolicy::for_email("a@x.com")).await.unwrap();
    let mut ids = Vec::new();
    for _ in 0..3 {
      ids.push(channel.publish("changes", message_for("a@x.com")).await.unwrap());
    }

    let delivered: Vec<String> = channel
      .drain("a@x.com")
      .await
      .into_iter()
      .map(|d| d.message_id)
      .collect();
    assert_eq!(delivered, ids[1..].to_vec());
  }

  #[async_std::test]
  async fn drain_empties_the_mailbox() {
    let channel = LocalChannel::with_topic("changes");
    channel.subscribe("changes", "email", "a@x.com", FilterPolicy::for_email("a@x.com")).await.unwrap();
    channel.publish("changes", message_for("a@x.com")).await.unwrap();
    assert_eq!(channel.drain("a@x.com").await.len(), 1);
    assert!(channel.drain("a@x.com").await.is_empty());
  }
}
