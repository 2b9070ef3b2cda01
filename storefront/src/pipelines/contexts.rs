// storefront/src/pipelines/contexts.rs

use actix_web::web::Bytes;

use crate::models::{CreatePaymentIntentRequest, CreatePaymentIntentResponse, OrderRef, WebhookEvent};
use crate::services::metadata_codec::MetadataBag;
use crate::state::AppState;

/// Where a webhook delivery got to. Rejections and failures are errors, not stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookStage {
  Received,
  SignatureChecked,
  MetadataDecoded,
  OrderResolved,
  Acknowledged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
  Pending,
  /// Verified, but not an event this service acts on.
  Ignored { event_type: String },
  /// The payment did not go through; nothing to create.
  PaymentFailed,
  Order(OrderRef),
}

#[derive(Clone)]
pub struct WebhookCtxData {
  pub app_state: AppState,
  /// Exactly as received; the signature covers these bytes.
  pub raw_body: Bytes,
  pub signature_header: Option<String>,
  pub stage: WebhookStage,
  pub event_type_raw: Option<String>,
  pub event: Option<WebhookEvent>,
  pub outcome: WebhookOutcome,
  pub cart_released: bool,
}

impl WebhookCtxData {
  pub fn new(app_state: AppState, raw_body: Bytes, signature_header: Option<String>) -> Self {
    Self {
      app_state,
      raw_body,
      signature_header,
      stage: WebhookStage::Received,
      event_type_raw: None,
      event: None,
      outcome: WebhookOutcome::Pending,
      cart_released: false,
    }
  }

  pub fn cart_id(&self) -> Option<&str> {
    let cart_id = self.event.as_ref()?.metadata.as_ref()?.cart_id.as_deref()?;
    (!cart_id.trim().is_empty()).then_some(cart_id)
  }
}

#[derive(Clone)]
pub struct PaymentIntentCtxData {
  pub app_state: AppState,
  pub request: CreatePaymentIntentRequest,
  pub metadata_bag: Option<MetadataBag>,
  pub response: Option<CreatePaymentIntentResponse>,
}

impl PaymentIntentCtxData {
  pub fn new(app_state: AppState, request: CreatePaymentIntentRequest) -> Self {
    Self {
      app_state,
      request,
      metadata_bag: None,
      response: None,
    }
  }
}
