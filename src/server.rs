use tide::http::headers::HeaderValue;
use tide::log::error;
use tide::prelude::*;
use tide::security::{CorsMiddleware, Origin};
use tide::{Request, Server, StatusCode};

use crate::models::CheckInput;
use crate::state::State;
use crate::triggers::RegisteredRule;
use crate::utils::{RespUtil, Page};

pub(crate) fn new(state: State) -> tide::Result<Server<State>> {
  tide::log::start();
  let mut app: Server<State> = Server::with_state(state);

  app.with(
    CorsMiddleware::new()
      .allow_methods("POST".parse::<HeaderValue>()?)
      .allow_origin(Origin::from("*"))
      .allow_credentials(false),
  );

  app.at("/").post(|mut req: Request<State>| async move {
    let body = req.body_string().await;
    let response = req.state().intake.handle_body(body).await;
    RespUtil::text(response.status, &response.body)
  });

  app.at("/check").post(|mut req: Request<State>| async move {
    let input: CheckInput = match req.body_json().await {
      Ok(input) => input,
      Err(e) => {
        error!("check payload rejected: {}", e);
        return RespUtil::text(StatusCode::InternalServerError, "error");
      }
    };
    match req.state().checker.run(input).await {
      Ok(_) => RespUtil::text(StatusCode::Ok, "success"),
      Err(e) => {
        error!("check failed ({}): {}", e.kind(), e);
        RespUtil::text(StatusCode::InternalServerError, "error")
      }
    }
  });

  app.at("/info").get(|_| async move {
    RespUtil::ok(json!({
      "message": "Pagewatch keeps an eye on your webpages.",
      "component": "pagewatch",
      "version": option_env!("CARGO_PKG_VERSION"),
    }))
  });

  app.at("/inbox/:email").get(|req: Request<State>| async move {
    // drains what the local channel queued for this endpoint
    let email = req.param::<String>("email")?;
    let deliveries = req.state().channel.drain(&email).await;
    let total = deliveries.len();
    RespUtil::ok(json!({
      "data": deliveries,
      "meta": { "total": total },
    }))
  });

  app.at("/schedules").get(|req: Request<State>| async move {
    let args: Page = req.query()?;
    let (total, data) = page_of(req.state().triggers.registered().await, &args);
    RespUtil::ok(json!({
      "data": data,
      "meta": {
        "total": total,
        "page": args.page,
        "size": args.size,
      }
    }))
  });

  Ok(app)
}

fn page_of(rules: Vec<RegisteredRule>, args: &Page) -> (usize, Vec<RegisteredRule>) {
  let total = rules.len();
  let data = rules.into_iter()
    .skip(args.page.saturating_sub(1) * args.size)
    .take(args.size)
    .collect();
  (total, data)
}
