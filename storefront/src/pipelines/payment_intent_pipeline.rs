// storefront/src/pipelines/payment_intent_pipeline.rs

use orderflow::{ContextData, Pipeline, PipelineControl, Registry};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::models::CreatePaymentIntentResponse;
use crate::pipelines::contexts::PaymentIntentCtxData;
use crate::services::metadata_codec;
use crate::services::payments::{IntentRequest, PaymentError};
use crate::state::AppState;

pub fn build_payment_intent_pipeline() -> Pipeline<PaymentIntentCtxData, AppError> {
  let mut p = Pipeline::<PaymentIntentCtxData, AppError>::new(&[
    ("validate_request", false, None),
    ("encode_metadata", false, None),
    ("create_intent", false, None),
  ]);

  p.on_root("validate_request", |ctx: ContextData<PaymentIntentCtxData>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      let validated = guard.request.clone().validate().map_err(PaymentError::Validation)?;
      guard.request = validated;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("encode_metadata", |ctx: ContextData<PaymentIntentCtxData>| {
    Box::pin(async move {
      let metadata = ctx.read().request.order_metadata();
      let bag = metadata_codec::encode(&metadata)
        .map_err(|e| AppError::Internal(format!("order metadata could not be encoded: {}", e)))?;
      ctx.write().metadata_bag = Some(bag);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("create_intent", create_intent);
  p
}

#[instrument(name = "payment_intent::create_intent", skip_all)]
async fn create_intent(ctx: ContextData<PaymentIntentCtxData>) -> Result<PipelineControl, AppError> {
  let (payments, request) = {
    let guard = ctx.read();
    let metadata = guard
      .metadata_bag
      .clone()
      .ok_or_else(|| AppError::Internal("create_intent ran before encode_metadata".to_string()))?;
    (
      guard.app_state.payments.clone(),
      IntentRequest {
        amount: guard.request.amount,
        currency: guard.request.currency.clone(),
        receipt_email: guard.request.email.clone(),
        metadata,
      },
    )
  };

  let created = payments.create_intent(request).await?;
  info!(confirmation_id = %created.confirmation_id, "Payment intent ready for the checkout UI.");

  ctx.write().response = Some(CreatePaymentIntentResponse {
    client_secret: created.client_secret,
    confirmation_id: created.confirmation_id,
  });
  Ok(PipelineControl::Continue)
}

pub fn register_payment_intent_pipeline(registry: &Arc<Registry<AppError>>, _app_state: &AppState) {
  registry.register_pipeline(build_payment_intent_pipeline());
  info!("Payment intent pipeline registered.");
}
