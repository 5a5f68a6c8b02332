use tide::http::Url;

use crate::errors::{FieldError, ValidationErrors};
use crate::models::{Interval, IntervalUnit, MonitorForm, MonitorRequest};

const MISSING: &str = "is missing";

/// Checks every field of the form and reports all failures together.
pub(crate) fn validate(form: MonitorForm) -> Result<MonitorRequest, ValidationErrors> {
  let mut errors = Vec::new();

  let email = match form.email {
    Some(email) if !email.trim().is_empty() => Some(email),
    _ => {
      errors.push(FieldError::new("email", MISSING));
      None
    }
  };

  let url = match form.url.as_deref() {
    Some(raw) if !raw.trim().is_empty() => match parse_url(raw) {
      Ok(url) => Some((raw.trim().to_string(), url)),
      Err(reason) => {
        errors.push(FieldError::new("url", reason));
        None
      }
    },
    _ => {
      errors.push(FieldError::new("url", MISSING));
      None
    }
  };

  let watch_phrase = match form.watch_phrase {
    Some(phrase) if !phrase.is_empty() => Some(phrase),
    _ => {
      errors.push(FieldError::new("watchPhrase", MISSING));
      None
    }
  };

  let value = match form.interval_value {
    None | Some(0) => {
      errors.push(FieldError::new("intervalValue", MISSING));
      None
    }
    Some(v) if v < 0 || v > i64::from(u32::MAX) => {
      errors.push(FieldError::new("intervalValue", "must be a positive integer"));
      None
    }
    Some(v) => Some(v as u32),
  };

  let unit = match form.interval_unit.as_deref() {
    None | Some("") => {
      errors.push(FieldError::new("intervalUnit", MISSING));
      None
    }
    Some(raw) => match IntervalUnit::parse(raw) {
      Some(unit) => Some(unit),
      None => {
        errors.push(FieldError::new(
          "intervalUnit",
          "must be one of minute, minutes, hour, hours, day, days",
        ));
        None
      }
    },
  };

  if let (Some(value), Some(unit)) = (value, unit) {
    if (value == 1) != unit.is_singular() {
      errors.push(FieldError::new(
        "intervalUnit",
        "must match multiplicity (singular/plural) of intervalValue",
      ));
    }
  }

  match (email, url, watch_phrase, value, unit) {
    (Some(email), Some((raw_url, url)), Some(watch_phrase), Some(value), Some(unit)) if errors.is_empty() => {
      Ok(MonitorRequest {
        email,
        raw_url,
        url,
        watch_phrase,
        interval: Interval { value, unit },
      })
    }
    _ => Err(ValidationErrors(errors)),
  }
}

fn parse_url(raw: &str) -> Result<Url, String> {
  let url = Url::parse(raw.trim()).map_err(|e| format!("is not a valid url: {}", e))?;
  if url.scheme() != "http" && url.scheme() != "https" {
    return Err(format!("has unsupported scheme {}", url.scheme()));
  }
  match url.host_str() {
    Some(host) if !host.is_empty() => Ok(url),
    _ => Err("has no hostname".to_string()),
  }
}
