// storefront/src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use orderflow::{ContextData, PipelineResult};
use serde_json::json;
use tracing::{error, info, instrument};

use crate::errors::AppError;
use crate::pipelines::contexts::{WebhookCtxData, WebhookOutcome};
use crate::state::AppState;

/// Checked in order; the first one present wins.
pub const SIGNATURE_HEADERS: [&str; 2] = ["payment-signature", "stripe-signature"];

fn signature_header(req: &HttpRequest) -> Option<String> {
  SIGNATURE_HEADERS
    .iter()
    .find_map(|name| req.headers().get(*name))
    .and_then(|value| value.to_str().ok())
    .map(String::from)
}

/// Receives processor events. The body is taken as raw bytes and only parsed
/// after the signature over those bytes checks out.
#[instrument(
  name = "handler::payment_webhook",
  skip(app_state, req, body),
  fields(body_len = body.len())
)]
pub async fn payment_webhook_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  let ctx = ContextData::new(WebhookCtxData::new(
    app_state.get_ref().clone(),
    body,
    signature_header(&req),
  ));

  match app_state.registry.run(ctx.clone()).await {
    Ok(PipelineResult::Completed) => {
      let final_ctx = ctx.read();
      match &final_ctx.outcome {
        WebhookOutcome::Order(order) => Ok(HttpResponse::Ok().json(json!({
          "received": true,
          "orderId": order.order_id,
          "orderNumber": order.order_number,
          "cartReleased": final_ctx.cart_released,
        }))),
        other => {
          error!(outcome = ?other, "Webhook pipeline completed without resolving an order.");
          Err(AppError::Internal("webhook completed without an order".to_string()))
        }
      }
    }
    Ok(PipelineResult::Stopped) => {
      let final_ctx = ctx.read();
      let status = match &final_ctx.outcome {
        WebhookOutcome::PaymentFailed => "payment_failed",
        _ => "ignored",
      };
      info!(
        status,
        event_type = final_ctx.event_type_raw.as_deref().unwrap_or("unknown"),
        "Webhook acknowledged without creating an order."
      );
      Ok(HttpResponse::Ok().json(json!({"received": true, "status": status})))
    }
    Err(app_err) => Err(app_err),
  }
}
