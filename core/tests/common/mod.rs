// tests/common/mod.rs
#![allow(dead_code)]

use once_cell::sync::Lazy;
use orderflow::{ContextData, FlowError, PipelineControl};

/// What a delivery looks like to the engine: a kind, an optional cart and a
/// journal of the handlers that ran.
#[derive(Clone, Debug, Default)]
pub struct Delivery {
  pub kind: String,
  pub cart: Option<String>,
  pub journal: Vec<String>,
  pub order: Option<u64>,
}

impl Delivery {
  pub fn of_kind(kind: &str) -> Self {
    Delivery {
      kind: kind.to_string(),
      ..Default::default()
    }
  }

  pub fn with_cart(mut self, cart: &str) -> Self {
    self.cart = Some(cart.to_string());
    self
  }
}

/// Application-side error the pipelines under test report.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
  /// Engine failures, kept as their message since `FlowError` is not `Clone`.
  #[error("engine: {0}")]
  Engine(String),
  #[error("rejected: {0}")]
  Rejected(String),
  #[error("backend unavailable: {0}")]
  Backend(String),
}

impl From<FlowError> for DeliveryError {
  fn from(err: FlowError) -> Self {
    DeliveryError::Engine(err.to_string())
  }
}

/// A step-local error type, converted into `DeliveryError` by the engine.
#[derive(Debug, thiserror::Error)]
#[error("signature header unusable: {0}")]
pub struct BadSignature(pub String);

impl From<BadSignature> for DeliveryError {
  fn from(err: BadSignature) -> Self {
    DeliveryError::Rejected(err.to_string())
  }
}

/// Appends `label` to the journal and continues.
pub fn journal(label: &'static str) -> orderflow::Handler<Delivery, DeliveryError> {
  Box::new(move |ctx: ContextData<Delivery>| {
    Box::pin(async move {
      ctx.write().journal.push(label.to_string());
      Ok(PipelineControl::Continue)
    })
  })
}

/// Stops the run for any delivery kind other than `payment_succeeded`,
/// the way the webhook acknowledges events it does not act on.
pub fn acknowledge_unless_paid() -> orderflow::Handler<Delivery, DeliveryError> {
  Box::new(|ctx: ContextData<Delivery>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.journal.push("classify".to_string());
      if guard.kind == "payment_succeeded" {
        Ok(PipelineControl::Continue)
      } else {
        Ok(PipelineControl::Stop)
      }
    })
  })
}

pub fn fail_with(label: &'static str, err: DeliveryError) -> orderflow::Handler<Delivery, DeliveryError> {
  Box::new(move |ctx: ContextData<Delivery>| {
    let err = err.clone();
    Box::pin(async move {
      ctx.write().journal.push(label.to_string());
      Err(err)
    })
  })
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("orderflow=debug")),
    )
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
