// storefront/src/services/materializer.rs

//! Turns decoded order metadata into exactly one tagged backend order per
//! payment confirmation.
//!
//! The check-then-create sequence is not atomic. Two deliveries of the same
//! confirmation racing each other can both create an order; every successful
//! create re-reads the tag afterwards and logs an error when it sees more than
//! one order, so operators can cancel the extra one.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use super::commerce::{BackendError, CommerceBackend};
use super::idempotency::IdempotencyGuard;
use crate::models::{confirmation_tag, payment_note, FinancialStatus, FulfillmentStatus, NewOrder, Order, OrderMetadata};

pub const DEFAULT_RECOVERY_WINDOW: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum MaterializeError {
  /// The backend refused or never answered. Nothing was created; retrying is safe.
  #[error("commerce backend rejected the request (status {status:?}): {source}")]
  BackendRejected {
    status: Option<u16>,
    #[source]
    source: BackendError,
  },
  /// The order exists but carries no confirmation tag yet.
  #[error("order {order_id} was created but could not be tagged for {confirmation_id}: {source}")]
  TagFailed {
    order_id: String,
    confirmation_id: String,
    #[source]
    source: BackendError,
  },
}

impl From<BackendError> for MaterializeError {
  fn from(source: BackendError) -> Self {
    MaterializeError::BackendRejected {
      status: source.status(),
      source,
    }
  }
}

#[derive(Clone)]
pub struct OrderMaterializer {
  backend: Arc<dyn CommerceBackend>,
  guard: IdempotencyGuard,
  recovery_window: Duration,
}

impl OrderMaterializer {
  pub fn new(backend: Arc<dyn CommerceBackend>, recovery_window: Duration) -> Self {
    Self {
      guard: IdempotencyGuard::new(backend.clone()),
      backend,
      recovery_window,
    }
  }

  pub fn guard(&self) -> &IdempotencyGuard {
    &self.guard
  }

  #[instrument(
    name = "materializer::materialize",
    skip(self, metadata),
    fields(email = %metadata.customer_email, items = metadata.line_items.len()),
    err(Display)
  )]
  pub async fn materialize(&self, metadata: &OrderMetadata, confirmation_id: &str) -> Result<Order, MaterializeError> {
    if let Some(existing) = self.guard.find_existing(confirmation_id).await? {
      info!(order_id = %existing.id, "Order already exists for this payment; nothing to do.");
      return Ok(existing);
    }

    let tag = confirmation_tag(confirmation_id);

    // An earlier delivery of this payment may have created the order and then
    // failed to tag it.
    if let Some(orphan) = self
      .guard
      .find_untagged_match(metadata, confirmation_id, self.recovery_window)
      .await?
    {
      return self.repair_tag(orphan, confirmation_id, tag).await;
    }

    let new_order = NewOrder {
      email: metadata.customer_email.clone(),
      line_items: metadata.line_items.clone(),
      shipping_address: metadata.shipping_address.clone(),
      financial_status: FinancialStatus::Paid,
      fulfillment_status: FulfillmentStatus::Unfulfilled,
      decrement_inventory: true,
      note: Some(payment_note(confirmation_id)),
    };
    let mut created = self.backend.create_order(new_order).await?;
    info!(order_id = %created.id, order_number = created.order_number, "Order created.");

    if let Err(source) = self.backend.add_tags(&created.id, std::slice::from_ref(&tag)).await {
      error!(
        order_id = %created.id,
        %confirmation_id,
        error = %source,
        "Order created but confirmation tag could not be added; a redelivery will try to recover it."
      );
      return Err(MaterializeError::TagFailed {
        order_id: created.id,
        confirmation_id: confirmation_id.to_string(),
        source,
      });
    }
    created.tags.insert(tag.clone());

    self.report_duplicates(&tag, confirmation_id).await;
    Ok(created)
  }

  async fn repair_tag(&self, mut orphan: Order, confirmation_id: &str, tag: String) -> Result<Order, MaterializeError> {
    match self.backend.add_tags(&orphan.id, std::slice::from_ref(&tag)).await {
      Ok(()) => {
        warn!(
          order_id = %orphan.id,
          %confirmation_id,
          "Recovered untagged order; tagged it instead of creating another."
        );
        orphan.tags.insert(tag);
        Ok(orphan)
      }
      Err(source) => {
        error!(
          order_id = %orphan.id,
          %confirmation_id,
          error = %source,
          "Untagged order found but tagging failed again."
        );
        Err(MaterializeError::TagFailed {
          order_id: orphan.id,
          confirmation_id: confirmation_id.to_string(),
          source,
        })
      }
    }
  }

  async fn report_duplicates(&self, tag: &str, confirmation_id: &str) {
    match self.backend.find_orders_by_tag(tag).await {
      Ok(orders) if orders.len() > 1 => {
        error!(
          %confirmation_id,
          order_ids = ?orders.iter().map(|o| o.id.as_str()).collect::<Vec<_>>(),
          "Duplicate orders exist for one payment confirmation."
        );
      }
      Ok(_) => {}
      Err(e) => warn!(%confirmation_id, error = %e, "Duplicate check skipped; tag lookup failed."),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{LineItem, ShippingAddress};
  use crate::services::commerce_mock::InMemoryCommerceBackend;

  fn metadata() -> OrderMetadata {
    OrderMetadata {
      customer_email: "a@b.com".to_string(),
      line_items: vec![LineItem {
        variant_id: "v1".to_string(),
        quantity: 2,
        title: "Shirt".to_string(),
        unit_price: 20.0,
      }],
      shipping_address: ShippingAddress {
        city: "X".to_string(),
        ..Default::default()
      },
      cart_id: Some("c1".to_string()),
    }
  }

  fn setup() -> (Arc<InMemoryCommerceBackend>, OrderMaterializer) {
    let backend = Arc::new(InMemoryCommerceBackend::new());
    let materializer = OrderMaterializer::new(backend.clone(), DEFAULT_RECOVERY_WINDOW);
    (backend, materializer)
  }

  #[tokio::test]
  async fn creates_a_paid_unfulfilled_tagged_order() {
    let (backend, materializer) = setup();
    backend.set_stock("v1", 10);

    let order = materializer.materialize(&metadata(), "pi_123").await.unwrap();

    assert_eq!(order.financial_status, FinancialStatus::Paid);
    assert_eq!(order.fulfillment_status, FulfillmentStatus::Unfulfilled);
    assert!(order.has_tag("payment_confirmation:pi_123"));
    assert_eq!(backend.orders_tagged("payment_confirmation:pi_123").len(), 1);
    assert_eq!(backend.stock("v1"), Some(8));
  }

  #[tokio::test]
  async fn second_call_only_looks_up() {
    let (backend, materializer) = setup();
    let first = materializer.materialize(&metadata(), "pi_123").await.unwrap();
    let (creates, tags) = (backend.create_calls(), backend.tag_calls());
    let (lookups, email_lookups) = (backend.tag_lookup_calls(), backend.email_lookup_calls());

    let second = materializer.materialize(&metadata(), "pi_123").await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(backend.create_calls(), creates);
    assert_eq!(backend.tag_calls(), tags);
    assert_eq!(backend.tag_lookup_calls(), lookups + 1);
    assert_eq!(backend.email_lookup_calls(), email_lookups);
    assert_eq!(backend.orders().len(), 1);
  }

  #[tokio::test]
  async fn create_failure_is_backend_rejected_with_status() {
    let (backend, materializer) = setup();
    backend.fail_next_create(BackendError::Status {
      status: 422,
      body: "variant sold out".to_string(),
    });

    let err = materializer.materialize(&metadata(), "pi_123").await.unwrap_err();
    assert!(matches!(err, MaterializeError::BackendRejected { status: Some(422), .. }));
    assert!(backend.orders().is_empty());
  }

  #[tokio::test]
  async fn timeout_is_backend_rejected_without_status() {
    let (backend, materializer) = setup();
    backend.fail_next_lookup(BackendError::Timeout);
    let err = materializer.materialize(&metadata(), "pi_123").await.unwrap_err();
    assert!(matches!(
      err,
      MaterializeError::BackendRejected {
        status: None,
        source: BackendError::Timeout
      }
    ));
    assert_eq!(backend.create_calls(), 0);
  }

  #[tokio::test]
  async fn tag_failure_is_surfaced_then_repaired_without_a_second_order() {
    let (backend, materializer) = setup();
    backend.fail_next_tag(BackendError::Transport("connection reset".to_string()));

    let err = materializer.materialize(&metadata(), "pi_123").await.unwrap_err();
    let orphan_id = match err {
      MaterializeError::TagFailed { order_id, confirmation_id, .. } => {
        assert_eq!(confirmation_id, "pi_123");
        order_id
      }
      other => panic!("expected TagFailed, got {other:?}"),
    };
    assert_eq!(backend.orders().len(), 1);

    let repaired = materializer.materialize(&metadata(), "pi_123").await.unwrap();
    assert_eq!(repaired.id, orphan_id);
    assert!(repaired.has_tag("payment_confirmation:pi_123"));
    assert_eq!(backend.create_calls(), 1);
    assert_eq!(backend.orders().len(), 1);
  }

  #[tokio::test]
  async fn failed_repair_reports_tag_failed_again() {
    let (backend, materializer) = setup();
    backend.fail_next_tag(BackendError::Timeout);
    backend.fail_next_tag(BackendError::Timeout);

    assert!(matches!(
      materializer.materialize(&metadata(), "pi_123").await,
      Err(MaterializeError::TagFailed { .. })
    ));
    assert!(matches!(
      materializer.materialize(&metadata(), "pi_123").await,
      Err(MaterializeError::TagFailed { .. })
    ));
    assert_eq!(backend.create_calls(), 1);
  }

  #[tokio::test]
  async fn another_payments_order_is_never_reused() {
    let (backend, materializer) = setup();
    let first = materializer.materialize(&metadata(), "pi_1").await.unwrap();
    let second = materializer.materialize(&metadata(), "pi_2").await.unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(backend.create_calls(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn overlapping_payments_from_one_customer_each_get_their_own_order() {
    let backend = Arc::new(InMemoryCommerceBackend::with_latency(Duration::from_millis(100)));
    let materializer = OrderMaterializer::new(backend.clone(), DEFAULT_RECOVERY_WINDOW);
    let m = metadata();

    // pi_2's untagged-order lookup lands after pi_1 created its order but
    // before pi_1 tagged it.
    let (a, b) = tokio::join!(materializer.materialize(&m, "pi_1"), async {
      tokio::time::sleep(Duration::from_millis(150)).await;
      materializer.materialize(&m, "pi_2").await
    });
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a.id, b.id);
    assert_eq!(backend.orders().len(), 2);
    assert_eq!(backend.create_calls(), 2);
    for (order, id) in [(&a, "pi_1"), (&b, "pi_2")] {
      let tagged = backend.orders_tagged(&confirmation_tag(id));
      assert_eq!(tagged.len(), 1);
      assert_eq!(tagged[0].id, order.id);
      assert!(tagged[0].created_for(id));
    }
  }

  #[tokio::test]
  async fn concurrent_deliveries_can_race_into_two_orders() {
    let backend = Arc::new(InMemoryCommerceBackend::with_latency(Duration::from_millis(20)));
    let materializer = OrderMaterializer::new(backend.clone(), DEFAULT_RECOVERY_WINDOW);
    let m = metadata();

    let (a, b) = tokio::join!(
      materializer.materialize(&m, "pi_race"),
      materializer.materialize(&m, "pi_race")
    );
    a.unwrap();
    b.unwrap();

    // The accepted race: both checks ran before either create. A later
    // delivery settles on the oldest of them.
    let tagged = backend.orders_tagged("payment_confirmation:pi_race");
    assert_eq!(tagged.len(), 2);
    let settled = materializer.materialize(&m, "pi_race").await.unwrap();
    assert!(tagged.iter().any(|o| o.id == settled.id));
    assert_eq!(backend.create_calls(), 2);
  }
}
