// storefront/src/web/handlers/payment_intent_handlers.rs

use actix_web::{web, HttpResponse};
use orderflow::{ContextData, PipelineResult};
use tracing::{error, instrument};

use crate::errors::AppError;
use crate::models::CreatePaymentIntentRequest;
use crate::pipelines::contexts::PaymentIntentCtxData;
use crate::state::AppState;

#[instrument(
  name = "handler::create_payment_intent",
  skip(app_state, req_body),
  fields(amount = req_body.amount, items = req_body.line_items.len())
)]
pub async fn create_payment_intent_handler(
  app_state: web::Data<AppState>,
  req_body: web::Json<CreatePaymentIntentRequest>,
) -> Result<HttpResponse, AppError> {
  let ctx = ContextData::new(PaymentIntentCtxData::new(app_state.get_ref().clone(), req_body.into_inner()));

  match app_state.registry.run(ctx.clone()).await? {
    PipelineResult::Completed => {
      let response = ctx.read().response.clone();
      match response {
        Some(body) => Ok(HttpResponse::Ok().json(body)),
        None => {
          error!("Payment intent pipeline completed without a response.");
          Err(AppError::Internal("payment intent was not created".to_string()))
        }
      }
    }
    PipelineResult::Stopped => Err(AppError::Internal("payment intent creation was halted".to_string())),
  }
}
