// storefront/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use storefront::config::{AppConfig, LogFormat};
use storefront::state::AppState;
use storefront::{telemetry, web};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  dotenvy::dotenv().ok();
  let log_format = std::env::var("LOG_FORMAT")
    .ok()
    .and_then(|raw| LogFormat::parse(&raw))
    .unwrap_or(LogFormat::Text);
  telemetry::init_tracing(log_format);

  tracing::info!("Starting storefront checkout service...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => cfg,
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }
  };
  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);

  let app_state = match AppState::from_config(app_config) {
    Ok(state) => state,
    Err(e) => {
      tracing::error!(error = %e, "Failed to build application state.");
      return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
    }
  };

  tracing::info!("Binding server to {}...", server_address);
  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
