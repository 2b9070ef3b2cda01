// storefront/src/services/payments.rs

//! Port to the payment processor plus its HTTP adapter.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

use super::metadata_codec::MetadataBag;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaymentError {
  #[error("{0}")]
  Validation(String),
  #[error("payment processor error: {0}")]
  Processor(String),
}

#[derive(Debug, Clone)]
pub struct IntentRequest {
  pub amount: u64,
  pub currency: String,
  pub receipt_email: String,
  pub metadata: MetadataBag,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedIntent {
  /// Payment confirmation identifier; later the idempotency key.
  pub confirmation_id: String,
  pub client_secret: String,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
  async fn create_intent(&self, request: IntentRequest) -> Result<CreatedIntent, PaymentError>;
}

#[derive(Deserialize)]
struct IntentResponse {
  id: String,
  client_secret: String,
}

#[derive(Deserialize)]
struct ProcessorErrorBody {
  error: ProcessorErrorDetail,
}

#[derive(Deserialize)]
struct ProcessorErrorDetail {
  #[serde(default)]
  message: Option<String>,
  #[serde(default, rename = "type")]
  kind: Option<String>,
}

#[derive(Clone)]
pub struct HttpPaymentProcessor {
  client: Client,
  api_base: String,
  secret_key: String,
}

impl HttpPaymentProcessor {
  pub fn new(api_base: &str, secret_key: &str, timeout: Duration) -> Result<Self, PaymentError> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| PaymentError::Processor(e.to_string()))?;
    Ok(Self {
      client,
      api_base: api_base.trim_end_matches('/').to_string(),
      secret_key: secret_key.to_string(),
    })
  }

  fn form_fields(request: &IntentRequest) -> Vec<(String, String)> {
    let mut fields = vec![
      ("amount".to_string(), request.amount.to_string()),
      ("currency".to_string(), request.currency.clone()),
      ("receipt_email".to_string(), request.receipt_email.clone()),
      ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
    ];
    let mut keys: Vec<&String> = request.metadata.keys().collect();
    keys.sort();
    for key in keys {
      fields.push((format!("metadata[{}]", key), request.metadata[key].clone()));
    }
    fields
  }
}

#[async_trait]
impl PaymentProcessor for HttpPaymentProcessor {
  #[instrument(
    name = "payments::create_intent",
    skip(self, request),
    fields(amount = request.amount, currency = %request.currency),
    err(Display)
  )]
  async fn create_intent(&self, request: IntentRequest) -> Result<CreatedIntent, PaymentError> {
    let response = self
      .client
      .post(format!("{}/v1/payment_intents", self.api_base))
      .basic_auth(&self.secret_key, None::<&str>)
      .form(&Self::form_fields(&request))
      .send()
      .await
      .map_err(|e| {
        if e.is_timeout() {
          PaymentError::Processor("request timed out".to_string())
        } else {
          PaymentError::Processor(e.to_string())
        }
      })?;

    let status = response.status();
    if !status.is_success() {
      let text = response.text().await.unwrap_or_default();
      let detail = serde_json::from_str::<ProcessorErrorBody>(&text)
        .ok()
        .and_then(|b| b.error.message.or(b.error.kind))
        .unwrap_or(text);
      return Err(PaymentError::Processor(format!("{}: {}", status, detail)));
    }

    let intent: IntentResponse = response
      .json()
      .await
      .map_err(|e| PaymentError::Processor(format!("unreadable response: {}", e)))?;
    info!(confirmation_id = %intent.id, "Payment intent created.");
    Ok(CreatedIntent {
      confirmation_id: intent.id,
      client_secret: intent.client_secret,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn metadata_is_sent_as_bracketed_form_fields() {
    let mut metadata = MetadataBag::new();
    metadata.insert("customer_email".to_string(), "a@b.com".to_string());
    metadata.insert("cart_id".to_string(), "c1".to_string());
    let fields = HttpPaymentProcessor::form_fields(&IntentRequest {
      amount: 4000,
      currency: "usd".to_string(),
      receipt_email: "a@b.com".to_string(),
      metadata,
    });

    assert!(fields.contains(&("automatic_payment_methods[enabled]".to_string(), "true".to_string())));
    assert!(fields.contains(&("metadata[cart_id]".to_string(), "c1".to_string())));
    assert!(fields.contains(&("metadata[customer_email]".to_string(), "a@b.com".to_string())));
    assert!(fields.contains(&("amount".to_string(), "4000".to_string())));
  }
}
