// storefront/src/services/poller.rs

//! Confirmation poller: asks the authoritative backend, over and over, whether
//! the order for a payment exists yet.
//!
//! No channel connects the webhook and the poller. The only shared state is
//! the backend's order list.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::idempotency::IdempotencyGuard;
use crate::models::OrderRef;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PollError {
  /// Expected while the webhook has not landed yet. Never surfaced by [`ConfirmationPoller::poll`].
  #[error("order not found yet")]
  NotFoundYet,
  #[error("order lookup failed: {0}")]
  BackendError(String),
  #[error("polling was cancelled")]
  Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
  Found(OrderRef),
  /// Attempts ran out. The order may still show up; the customer gets an email either way.
  StillProcessing,
}

/// One lookup attempt. `Err(PollError::NotFoundYet)` means "ask again later".
#[async_trait]
pub trait OrderLookup: Send + Sync {
  async fn lookup(&self, confirmation_id: &str) -> Result<OrderRef, PollError>;
}

#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
  pub max_attempts: u32,
  pub interval: Duration,
}

impl Default for PollerConfig {
  fn default() -> Self {
    Self {
      max_attempts: DEFAULT_MAX_ATTEMPTS,
      interval: DEFAULT_INTERVAL,
    }
  }
}

pub struct ConfirmationPoller {
  lookup: Arc<dyn OrderLookup>,
  config: PollerConfig,
  cancel: CancellationToken,
}

impl ConfirmationPoller {
  pub fn new(lookup: Arc<dyn OrderLookup>, config: PollerConfig, cancel: CancellationToken) -> Self {
    Self { lookup, config, cancel }
  }

  /// Token that stops this poller. Cancelling it drops any pending wait; a
  /// request already in flight is allowed to finish, but no new one is sent.
  pub fn cancellation_token(&self) -> CancellationToken {
    self.cancel.clone()
  }

  #[instrument(name = "poller::poll", skip(self), fields(max_attempts = self.config.max_attempts))]
  pub async fn poll(&self, confirmation_id: &str) -> Result<PollOutcome, PollError> {
    for attempt in 1..=self.config.max_attempts {
      if self.cancel.is_cancelled() {
        debug!(attempt, "Cancelled before querying.");
        return Err(PollError::Cancelled);
      }

      match self.lookup.lookup(confirmation_id).await {
        Ok(found) => {
          info!(attempt, order_number = found.order_number, "Order found.");
          return Ok(PollOutcome::Found(found));
        }
        Err(PollError::NotFoundYet) => debug!(attempt, "Order not there yet."),
        Err(other) => {
          warn!(attempt, error = %other, "Order lookup failed; giving up.");
          return Err(other);
        }
      }

      if attempt < self.config.max_attempts {
        tokio::select! {
          _ = self.cancel.cancelled() => {
            debug!(attempt, "Cancelled while waiting.");
            return Err(PollError::Cancelled);
          }
          _ = tokio::time::sleep(self.config.interval) => {}
        }
      }
    }
    info!("Attempts exhausted; order still processing.");
    Ok(PollOutcome::StillProcessing)
  }
}

/// Asks the storefront's own order-lookup endpoint.
#[derive(Clone)]
pub struct HttpOrderLookup {
  client: Client,
  endpoint: String,
}

impl HttpOrderLookup {
  /// `base_url` is the storefront origin, e.g. `https://shop.example.com`.
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PollError> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| PollError::BackendError(e.to_string()))?;
    Ok(Self {
      client,
      endpoint: format!("{}/api/v1/orders/lookup", base_url.trim_end_matches('/')),
    })
  }
}

#[async_trait]
impl OrderLookup for HttpOrderLookup {
  async fn lookup(&self, confirmation_id: &str) -> Result<OrderRef, PollError> {
    let response = self
      .client
      .get(&self.endpoint)
      .query(&[("confirmationId", confirmation_id)])
      .header("Cache-Control", "no-cache")
      .send()
      .await
      .map_err(|e| PollError::BackendError(e.to_string()))?;

    match response.status() {
      StatusCode::NOT_FOUND => Err(PollError::NotFoundYet),
      s if s.is_success() => response
        .json::<OrderRef>()
        .await
        .map_err(|e| PollError::BackendError(format!("unreadable lookup response: {}", e))),
      s => Err(PollError::BackendError(format!("lookup responded with {}", s))),
    }
  }
}

/// Asks the commerce backend directly through the idempotency guard's tag lookup.
#[derive(Clone)]
pub struct BackendOrderLookup {
  guard: IdempotencyGuard,
}

impl BackendOrderLookup {
  pub fn new(guard: IdempotencyGuard) -> Self {
    Self { guard }
  }
}

#[async_trait]
impl OrderLookup for BackendOrderLookup {
  async fn lookup(&self, confirmation_id: &str) -> Result<OrderRef, PollError> {
    match self.guard.find_existing(confirmation_id).await {
      Ok(Some(order)) => Ok(order.reference()),
      Ok(None) => Err(PollError::NotFoundYet),
      Err(e) => Err(PollError::BackendError(e.to_string())),
    }
  }
}
