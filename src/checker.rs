use async_std::future;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tide::http::Url;
use tide::log::info;

use crate::errors::MonitorError;
use crate::models::{ChangeEvent, CheckInput, CheckOutcome};
use crate::notifier::Notifier;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FetchedPage {
  pub status: u16,
  pub body: String,
}

#[async_trait]
pub(crate) trait PageFetcher: Send + Sync {
  async fn fetch(&self, url: &Url) -> Result<FetchedPage, MonitorError>;
}

/// Single GET per check, bounded by `timeout`; no retries.
pub(crate) struct HttpFetcher {
  timeout: Duration,
}

impl HttpFetcher {
  pub fn new(timeout: Duration) -> Self {
    HttpFetcher { timeout }
  }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
  async fn fetch(&self, url: &Url) -> Result<FetchedPage, MonitorError> {
    let request = async {
      let mut response = surf::get(url.as_str())
        .await
        .map_err(|e| MonitorError::fetch(url.as_str(), e))?;
      let status = response.status().as_u16();
      let body = response
        .body_string()
        .await
        .map_err(|e| MonitorError::fetch(url.as_str(), e))?;
      Ok::<_, MonitorError>(FetchedPage { status, body })
    };
    future::timeout(self.timeout, request)
      .await
      .map_err(|_| MonitorError::fetch(url.as_str(), "request timed out"))?
  }
}

/// Stateless page check; publishes a change event when the phrase is gone.
#[derive(Clone)]
pub(crate) struct Checker {
  fetcher: Arc<dyn PageFetcher>,
  notifier: Notifier,
}

impl Checker {
  pub fn new(fetcher: Arc<dyn PageFetcher>, notifier: Notifier) -> Self {
    Checker { fetcher, notifier }
  }

  /// The page counts as changed exactly when the phrase is no longer in the raw body.
  pub async fn check(&self, url: &Url, watch_phrase: &str) -> Result<CheckOutcome, MonitorError> {
    let page = self.fetcher.fetch(url).await?;
    if !(200..300).contains(&page.status) {
      return Err(MonitorError::fetch(url.as_str(), format!("status {}", page.status)));
    }
    Ok(CheckOutcome { changed: !page.body.contains(watch_phrase) })
  }

  pub async fn run(&self, input: CheckInput) -> Result<CheckOutcome, MonitorError> {
    let url = Url::parse(&input.url).map_err(|e| MonitorError::fetch(input.url.as_str(), e))?;
    if input.watch_phrase.is_empty() {
      return Err(MonitorError::fetch(input.url.as_str(), "watch phrase is empty"));
    }

    let outcome = self.check(&url, &input.watch_phrase).await?;
    if outcome.changed {
      info!("webpage changed, {} not found anymore on {}", input.watch_phrase, url);
      self.notifier.publish(&ChangeEvent::new(input, &url)).await?;
    }
    Ok(outcome)
  }
}
