// storefront/src/web/routes.rs

use actix_web::http::header::{CACHE_CONTROL, PRAGMA};
use actix_web::middleware::DefaultHeaders;
use actix_web::{web, HttpResponse};

use crate::errors::AppError;
use crate::web::handlers::{order_lookup_handlers, payment_intent_handlers, webhook_handlers};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .app_data(
        web::JsonConfig::default()
          .error_handler(|err, _req| AppError::Validation(format!("invalid request body: {}", err)).into()),
      )
      .route("/health", web::get().to(health_check_handler))
      .route(
        "/payment-intents",
        web::post().to(payment_intent_handlers::create_payment_intent_handler),
      )
      // A cached 404 would leave the poller looking at a stale answer forever.
      .service(
        web::resource("/orders/lookup")
          .wrap(
            DefaultHeaders::new()
              .add((CACHE_CONTROL, "no-store, max-age=0"))
              .add((PRAGMA, "no-cache")),
          )
          .route(web::get().to(order_lookup_handlers::order_lookup_handler)),
      )
      .service(
        web::scope("/webhooks").route(
          "/payments",
          web::post().to(webhook_handlers::payment_webhook_handler),
        ),
      ),
  );
}
