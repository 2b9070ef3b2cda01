// storefront/src/models/webhook_event.rs

use serde::Deserialize;
use std::collections::HashMap;

use super::metadata::OrderMetadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
  PaymentSucceeded,
  PaymentFailed,
  Other,
}

impl EventType {
  pub fn from_processor_type(raw: &str) -> Self {
    match raw {
      "payment_intent.succeeded" => EventType::PaymentSucceeded,
      "payment_intent.payment_failed" => EventType::PaymentFailed,
      _ => EventType::Other,
    }
  }
}

/// Wire shape of a processor event. Only the fields this service reads.
#[derive(Debug, Clone, Deserialize)]
pub struct EventEnvelope {
  pub id: String,
  #[serde(rename = "type")]
  pub event_type: String,
  #[serde(default)]
  pub created: Option<i64>,
  pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
  pub object: IntentObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntentObject {
  /// The payment confirmation identifier.
  pub id: String,
  #[serde(default)]
  pub metadata: HashMap<String, String>,
  #[serde(default)]
  pub last_payment_error: Option<PaymentErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentErrorDetail {
  #[serde(default)]
  pub code: Option<String>,
  #[serde(default)]
  pub message: Option<String>,
}

/// A verified event for the duration of one webhook invocation.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
  pub event_id: String,
  pub event_type: EventType,
  pub confirmation_id: String,
  /// Filled in once the metadata bag has been decoded.
  pub metadata: Option<OrderMetadata>,
  pub raw_metadata: HashMap<String, String>,
  pub failure_reason: Option<String>,
}

impl From<EventEnvelope> for WebhookEvent {
  fn from(env: EventEnvelope) -> Self {
    let failure_reason = env
      .data
      .object
      .last_payment_error
      .and_then(|e| e.message.or(e.code));
    WebhookEvent {
      event_id: env.id,
      event_type: EventType::from_processor_type(&env.event_type),
      confirmation_id: env.data.object.id,
      metadata: None,
      raw_metadata: env.data.object.metadata,
      failure_reason,
    }
  }
}
