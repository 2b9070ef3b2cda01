// storefront/src/pipelines/webhook_pipeline.rs

//! Webhook reconciliation: verify -> parse -> decode -> resolve order ->
//! release cart -> acknowledge. One run per delivery; nothing survives it.

use orderflow::{ContextData, Pipeline, PipelineControl, Registry, SkipCondition};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::webhook_event::EventEnvelope;
use crate::models::{EventType, WebhookEvent};
use crate::pipelines::contexts::{WebhookCtxData, WebhookOutcome, WebhookStage};
use crate::services::cart::CartSession;
use crate::services::{metadata_codec, signature};
use crate::state::AppState;

pub const STEPS: [&str; 6] = [
  "verify_signature",
  "parse_event",
  "decode_metadata",
  "resolve_order",
  "release_cart",
  "acknowledge",
];

#[instrument(name = "webhook::verify_signature", skip_all)]
async fn verify_signature(ctx: ContextData<WebhookCtxData>) -> Result<PipelineControl, AppError> {
  let (body, header, secret, tolerance) = {
    let guard = ctx.read();
    (
      guard.raw_body.clone(),
      guard.signature_header.clone(),
      guard.app_state.config.webhook_secret.clone(),
      guard.app_state.config.signature_tolerance,
    )
  };
  let header = header.ok_or(AppError::MissingSignature)?;
  signature::verify(&body, &header, &secret, tolerance)?;

  ctx.write().stage = WebhookStage::SignatureChecked;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "webhook::parse_event", skip_all)]
async fn parse_event(ctx: ContextData<WebhookCtxData>) -> Result<PipelineControl, AppError> {
  let body = ctx.read().raw_body.clone();
  let envelope: EventEnvelope =
    serde_json::from_slice(&body).map_err(|e| AppError::MalformedEvent(e.to_string()))?;
  let raw_type = envelope.event_type.clone();
  let event = WebhookEvent::from(envelope);

  let control = match event.event_type {
    EventType::PaymentSucceeded => PipelineControl::Continue,
    EventType::PaymentFailed => {
      info!(
        confirmation_id = %event.confirmation_id,
        reason = event.failure_reason.as_deref().unwrap_or("unknown"),
        "Payment failed; no order will be created."
      );
      PipelineControl::Stop
    }
    EventType::Other => {
      info!(event_type = %raw_type, event_id = %event.event_id, "Ignoring event type.");
      PipelineControl::Stop
    }
  };

  let mut guard = ctx.write();
  guard.outcome = match event.event_type {
    EventType::PaymentSucceeded => WebhookOutcome::Pending,
    EventType::PaymentFailed => WebhookOutcome::PaymentFailed,
    EventType::Other => WebhookOutcome::Ignored {
      event_type: raw_type.clone(),
    },
  };
  guard.event_type_raw = Some(raw_type);
  guard.event = Some(event);
  Ok(control)
}

#[instrument(name = "webhook::decode_metadata", skip_all)]
async fn decode_metadata(ctx: ContextData<WebhookCtxData>) -> Result<PipelineControl, AppError> {
  let mut guard = ctx.write();
  let event = guard
    .event
    .as_mut()
    .ok_or_else(|| AppError::Internal("decode_metadata ran before parse_event".to_string()))?;
  let decoded = metadata_codec::decode(&event.raw_metadata).map_err(|e| {
    warn!(confirmation_id = %event.confirmation_id, error = %e, "Metadata decode failed; asking for redelivery.");
    e
  })?;
  event.metadata = Some(decoded);
  guard.stage = WebhookStage::MetadataDecoded;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "webhook::resolve_order", skip_all)]
async fn resolve_order(ctx: ContextData<WebhookCtxData>) -> Result<PipelineControl, AppError> {
  let (materializer, confirmation_id, metadata) = {
    let guard = ctx.read();
    let event = guard
      .event
      .as_ref()
      .ok_or_else(|| AppError::Internal("resolve_order ran before parse_event".to_string()))?;
    let metadata = event
      .metadata
      .clone()
      .ok_or_else(|| AppError::Internal("resolve_order ran before decode_metadata".to_string()))?;
    (guard.app_state.materializer.clone(), event.confirmation_id.clone(), metadata)
  };

  let order = materializer.materialize(&metadata, &confirmation_id).await?;

  let mut guard = ctx.write();
  guard.outcome = WebhookOutcome::Order(order.reference());
  guard.stage = WebhookStage::OrderResolved;
  Ok(PipelineControl::Continue)
}

/// Empties the customer's cart once their order exists. Never fails the delivery.
#[instrument(name = "webhook::release_cart", skip_all)]
async fn release_cart(ctx: ContextData<WebhookCtxData>) -> Result<PipelineControl, AppError> {
  let (store, cart_id) = {
    let guard = ctx.read();
    (guard.app_state.carts.clone(), guard.cart_id().map(str::to_string))
  };
  let Some(cart_id) = cart_id else {
    return Ok(PipelineControl::Continue);
  };

  let released = CartSession::open(store, &cart_id).and_then(|mut session| {
    session.clear();
    session.commit()
  });
  match released {
    Ok(()) => ctx.write().cart_released = true,
    Err(e) => warn!(%cart_id, error = %e, "Cart could not be released after order creation."),
  }
  Ok(PipelineControl::Continue)
}

pub fn build_webhook_pipeline() -> Pipeline<WebhookCtxData, AppError> {
  let no_cart: SkipCondition<WebhookCtxData> = Arc::new(|ctx: ContextData<WebhookCtxData>| {
    let missing = ctx.read().cart_id().is_none();
    missing
  });

  let mut p = Pipeline::<WebhookCtxData, AppError>::new(&[
    (STEPS[0], false, None),
    (STEPS[1], false, None),
    (STEPS[2], false, None),
    (STEPS[3], false, None),
    (STEPS[4], true, Some(no_cart)),
    (STEPS[5], false, None),
  ]);

  p.on_root("verify_signature", verify_signature);
  p.on_root("parse_event", parse_event);
  p.on_root("decode_metadata", decode_metadata);
  p.on_root("resolve_order", resolve_order);
  p.on_root("release_cart", release_cart);
  p.on_root("acknowledge", |ctx: ContextData<WebhookCtxData>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.stage = WebhookStage::Acknowledged;
      if let WebhookOutcome::Order(order) = &guard.outcome {
        info!(order_id = %order.order_id, order_number = order.order_number, "Webhook acknowledged.");
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });
  p
}

pub fn register_webhook_pipeline(registry: &Arc<Registry<AppError>>, _app_state: &AppState) {
  registry.register_pipeline(build_webhook_pipeline());
  info!("Webhook reconciliation pipeline registered.");
}
