use serde::{Serialize, Deserialize};
use serde_json::Value;
use tide::{Response, Result, StatusCode};

#[derive(Serialize, Deserialize)]
#[serde(default)]
pub (crate) struct Page {
    pub size: usize,
    pub page: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            size: 25,
            page: 1,
        }
    }
}

pub (crate) struct RespUtil;

impl RespUtil {

  pub fn ok(data: Value) -> Result<Response> {
    Self::with_status(StatusCode::Ok, data)
  }

  pub fn text(status: StatusCode, body: &str) -> Result<Response> {
    let mut resp = Response::new(status);
    resp.set_content_type("text/plain");
    resp.set_body(body);
    Ok(resp)
  }

  pub fn with_status(status: StatusCode, data: Value)
    -> Result<Response> {
    let mut resp = Response::new(status);
    resp.set_body(data);
    Ok(resp)
  }

}
