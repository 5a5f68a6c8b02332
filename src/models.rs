use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tide::http::Url;

pub(crate) const EMAIL_ATTRIBUTE: &str = "email";

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum IntervalUnit {
  Minute,
  Minutes,
  Hour,
  Hours,
  Day,
  Days,
}

impl IntervalUnit {
  pub fn parse(value: &str) -> Option<Self> {
    match value {
      "minute" => Some(IntervalUnit::Minute),
      "minutes" => Some(IntervalUnit::Minutes),
      "hour" => Some(IntervalUnit::Hour),
      "hours" => Some(IntervalUnit::Hours),
      "day" => Some(IntervalUnit::Day),
      "days" => Some(IntervalUnit::Days),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      IntervalUnit::Minute => "minute",
      IntervalUnit::Minutes => "minutes",
      IntervalUnit::Hour => "hour",
      IntervalUnit::Hours => "hours",
      IntervalUnit::Day => "day",
      IntervalUnit::Days => "days",
    }
  }

  pub fn is_singular(&self) -> bool {
    matches!(self, IntervalUnit::Minute | IntervalUnit::Hour | IntervalUnit::Day)
  }

  pub fn seconds(&self) -> u64 {
    match self {
      IntervalUnit::Minute | IntervalUnit::Minutes => 60,
      IntervalUnit::Hour | IntervalUnit::Hours => 60 * 60,
      IntervalUnit::Day | IntervalUnit::Days => 24 * 60 * 60,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Interval {
  pub value: u32,
  pub unit: IntervalUnit,
}

impl Interval {
  pub fn rate_expression(&self) -> String {
    format!("rate({} {})", self.value, self.unit.as_str())
  }

  /// Reads back an expression of the form `rate(<N> <unit>)`.
  pub fn from_rate_expression(expression: &str) -> Option<Self> {
    let inner = expression.trim().strip_prefix("rate(")?.strip_suffix(')')?;
    let mut parts = inner.split_whitespace();
    let value = parts.next()?.parse::<u32>().ok()?;
    let unit = IntervalUnit::parse(parts.next()?)?;
    if parts.next().is_some() || value == 0 {
      return None;
    }
    Some(Interval { value, unit })
  }

  pub fn period(&self) -> Duration {
    Duration::from_secs(u64::from(self.value) * self.unit.seconds())
  }
}

/// Body accepted by the intake endpoint, before any validation.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MonitorForm {
  pub email: Option<String>,
  pub url: Option<String>,
  pub watch_phrase: Option<String>,
  pub interval_value: Option<i64>,
  pub interval_unit: Option<String>,
}

/// A monitor request whose fields all passed validation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MonitorRequest {
  pub email: String,
  /// The url as submitted, trimmed; this is what the checker receives.
  pub raw_url: String,
  pub url: Url,
  pub watch_phrase: String,
  pub interval: Interval,
}

impl MonitorRequest {
  pub fn hostname(&self) -> String {
    self.url.host_str().unwrap_or_default().to_string()
  }

  pub fn check_input(&self) -> CheckInput {
    CheckInput {
      email: self.email.clone(),
      url: self.raw_url.clone(),
      watch_phrase: self.watch_phrase.clone(),
    }
  }
}

/// Payload a schedule hands to the checker every time it fires.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CheckInput {
  pub email: String,
  pub url: String,
  pub watch_phrase: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Rule {
  pub name: String,
  pub schedule_expression: String,
  pub description: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Target {
  pub id: String,
  pub address: String,
  pub input: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Schedule {
  pub id: String,
  pub arn: String,
  pub rate_expression: String,
  pub description: String,
  pub target: Target,
  pub payload: CheckInput,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Grant {
  pub statement_id: String,
  pub principal: String,
  pub action: String,
  pub resource: String,
  pub source_arn: String,
}

/// Attribute name to accepted values; a message passes when every key matches.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub(crate) struct FilterPolicy(pub HashMap<String, Vec<String>>);

impl FilterPolicy {
  pub fn for_email(endpoint: &str) -> Self {
    let mut policy = HashMap::new();
    policy.insert(EMAIL_ATTRIBUTE.to_string(), vec![endpoint.to_string()]);
    FilterPolicy(policy)
  }

  pub fn matches(&self, attributes: &HashMap<String, String>) -> bool {
    self.0.iter().all(|(key, accepted)| {
      attributes
        .get(key)
        .map_or(false, |value| accepted.iter().any(|a| a == value))
    })
  }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Subscription {
  pub arn: String,
  pub protocol: String,
  pub endpoint: String,
  pub filter_policy: FilterPolicy,
}

/// What goes over the notification channel.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub(crate) struct Message {
  pub subject: String,
  pub body: String,
  pub attributes: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ChangeEvent {
  pub url: String,
  pub hostname: String,
  pub watch_phrase: String,
  pub email: String,
}

impl ChangeEvent {
  /// `url` is the parsed form of `input.url`; the submitted text is kept for the body.
  pub fn new(input: CheckInput, url: &Url) -> Self {
    ChangeEvent {
      url: input.url,
      hostname: url.host_str().unwrap_or_default().to_string(),
      watch_phrase: input.watch_phrase,
      email: input.email,
    }
  }

  pub fn subject(&self) -> String {
    format!("Webpage {} changed", self.hostname)
  }

  pub fn message_body(&self) -> String {
    format!(
      "Webpage {} changed. Watched phrase '{}' is not found on the webpage anymore",
      self.url, self.watch_phrase
    )
  }

  pub fn to_message(&self) -> Message {
    let mut attributes = HashMap::new();
    attributes.insert(EMAIL_ATTRIBUTE.to_string(), self.email.clone());
    Message {
      subject: self.subject(),
      body: self.message_body(),
      attributes,
    }
  }
}

/// A message handed to one subscription's endpoint.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Delivery {
  pub message_id: String,
  pub subscription_arn: String,
  pub endpoint: String,
  pub subject: String,
  pub body: String,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub(crate) struct CheckOutcome {
  pub changed: bool,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rate_expression_keeps_unit_verbatim() {
    let interval = Interval { value: 5, unit: IntervalUnit::Minutes };
    assert_eq!(interval.rate_expression(), "rate(5 minutes)");
    let interval = Interval { value: 1, unit: IntervalUnit::Day };
    assert_eq!(interval.rate_expression(), "rate(1 day)");
  }

  #[test]
  fn rate_expression_parses_back_to_a_period() {
    let interval = Interval::from_rate_expression("rate(2 hours)").unwrap();
    assert_eq!(interval, Interval { value: 2, unit: IntervalUnit::Hours });
    assert_eq!(interval.period(), Duration::from_secs(7200));

    assert!(Interval::from_rate_expression("rate(0 minutes)").is_none());
    assert!(Interval::from_rate_expression("rate(5 weeks)").is_none());
    assert!(Interval::from_rate_expression("cron(0 12 * * ? *)").is_none());
  }

  #[test]
  fn change_event_subject_uses_hostname() {
    let input = CheckInput {
      email: "a@x.com".to_string(),
      url: "https://Example.COM/some/page".to_string(),
      watch_phrase: "Example Domain".to_string(),
    };
    let url = Url::parse(&input.url).unwrap();
    let message = ChangeEvent::new(input, &url).to_message();
    assert_eq!(message.subject, "Webpage example.com changed");
    assert!(message.body.starts_with("Webpage https://Example.COM/some/page changed."));
    assert!(message.body.contains("'Example Domain'"));
    assert!(!message.body.contains("a@x.com"));
    assert_eq!(message.attributes.get("email").map(String::as_str), Some("a@x.com"));
  }

  #[test]
  fn filter_policy_matches_only_its_endpoint() {
    let policy = FilterPolicy::for_email("a@x.com");
    let mut attributes = HashMap::new();
    attributes.insert("email".to_string(), "a@x.com".to_string());
    assert!(policy.matches(&attributes));

    attributes.insert("email".to_string(), "b@x.com".to_string());
    assert!(!policy.matches(&attributes));
    assert!(!policy.matches(&HashMap::new()));
  }

  #[test]
  fn filter_policy_serializes_as_attribute_map() {
    let policy = FilterPolicy::for_email("a@x.com");
    assert_eq!(serde_json::to_string(&policy).unwrap(), r#"{"email":["a@x.com"]}"#);
  }

  #[test]
  fn check_input_uses_camel_case_keys() {
    let input: CheckInput = serde_json::from_str(
      r#"{"email":"a@x.com","url":"https://example.com","watchPhrase":"Example"}"#,
    ).unwrap();
    assert_eq!(input.watch_phrase, "Example");
  }
}
