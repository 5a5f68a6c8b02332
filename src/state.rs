use std::sync::Arc;

use crate::channel::LocalChannel;
use crate::checker::{Checker, HttpFetcher};
use crate::config::Config;
use crate::grantor::PermissionGrantor;
use crate::intake::Intake;
use crate::notifier::Notifier;
use crate::permissions::LocalPermissions;
use crate::registrar::ScheduleRegistrar;
use crate::subscriptions::SubscriptionManager;
use crate::triggers::{Dispatcher, HttpInvoker, LocalTriggers};

pub(crate) type State = Arc<Services>;

/// Components built once at startup and shared by every request.
pub(crate) struct Services {
  pub intake: Intake,
  pub checker: Checker,
  pub channel: Arc<LocalChannel>,
  pub triggers: Arc<LocalTriggers>,
}

pub(crate) fn new_state(config: &Config) -> State {
  let channel = Arc::new(LocalChannel::with_topic(&config.topic_id));
  let permissions = Arc::new(LocalPermissions::new(&config.checker_identity));
  let dispatcher = Arc::new(Dispatcher::new(
    permissions.clone(),
    Arc::new(HttpInvoker),
    &config.trigger_principal,
    &config.checker_identity,
  ));
  let triggers = Arc::new(LocalTriggers::with_dispatcher(dispatcher));

  let intake = Intake {
    registrar: ScheduleRegistrar::new(triggers.clone(), &config.checker_address),
    grantor: PermissionGrantor::new(permissions, &config.trigger_principal),
    subscriptions: SubscriptionManager::new(channel.clone()),
    checker_identity: config.checker_identity.clone(),
    topic: config.topic_id.clone(),
    timeout: config.intake_timeout,
  };
  let checker = Checker::new(
    Arc::new(HttpFetcher::new(config.fetch_timeout)),
    Notifier::new(channel.clone(), &config.topic_id),
  );

  Arc::new(Services { intake, checker, channel, triggers })
}

impl Services {
  pub async fn stop(&self) {
    self.triggers.stop().await;
  }
}
