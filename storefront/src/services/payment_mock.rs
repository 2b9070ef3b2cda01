// storefront/src/services/payment_mock.rs

//! In-memory payment processor. Remembers every intent so tests can play the
//! processor's side of the webhook afterwards.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, instrument};
use uuid::Uuid;

use super::payments::{CreatedIntent, IntentRequest, PaymentError, PaymentProcessor};

#[derive(Default)]
pub struct MockPaymentProcessor {
  intents: RwLock<HashMap<String, IntentRequest>>,
  fail_next: AtomicBool,
}

impl MockPaymentProcessor {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn fail_next(&self) {
    self.fail_next.store(true, Ordering::SeqCst);
  }

  pub fn intent(&self, confirmation_id: &str) -> Option<IntentRequest> {
    self.intents.read().get(confirmation_id).cloned()
  }

  pub fn intent_count(&self) -> usize {
    self.intents.read().len()
  }

  /// The event body the processor would deliver for this intent.
  /// `event_type` is the processor's name, e.g. `payment_intent.succeeded`.
  pub fn event_body(&self, confirmation_id: &str, event_type: &str) -> Option<Vec<u8>> {
    let intent = self.intent(confirmation_id)?;
    let body = json!({
      "id": format!("evt_{}", Uuid::new_v4().simple()),
      "type": event_type,
      "created": chrono::Utc::now().timestamp(),
      "data": {
        "object": {
          "id": confirmation_id,
          "amount": intent.amount,
          "currency": intent.currency,
          "metadata": intent.metadata,
        }
      }
    });
    serde_json::to_vec(&body).ok()
  }
}

#[async_trait]
impl PaymentProcessor for MockPaymentProcessor {
  #[instrument(name = "payment_mock::create_intent", skip(self, request), fields(amount = request.amount))]
  async fn create_intent(&self, request: IntentRequest) -> Result<CreatedIntent, PaymentError> {
    if self.fail_next.swap(false, Ordering::SeqCst) {
      return Err(PaymentError::Processor("mock processor unavailable".to_string()));
    }
    let confirmation_id = format!("pi_{}", Uuid::new_v4().simple());
    let client_secret = format!("{}_secret_{}", confirmation_id, Uuid::new_v4().simple());
    self.intents.write().insert(confirmation_id.clone(), request);
    info!(%confirmation_id, "Simulated payment intent creation.");
    Ok(CreatedIntent {
      confirmation_id,
      client_secret,
    })
  }
}
