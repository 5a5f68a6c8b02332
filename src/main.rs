mod channel;
mod checker;
mod config;
mod errors;
mod grantor;
mod intake;
mod models;
mod notifier;
mod permissions;
mod registrar;
mod server;
mod state;
mod subscriptions;
mod triggers;
mod utils;
mod validation;

#[async_std::main]
async fn main() -> tide::Result<()> {
  dotenv::dotenv().ok();
  let config = config::Config::from_env()?;
  let state = state::new_state(&config);

  server::new(state.clone())?
    .listen(config.listen_addr.clone())
    .await?;

  state.stop().await;
  Ok(())
}
