// storefront/src/services/idempotency.rs

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::commerce::{BackendError, CommerceBackend};
use crate::models::{confirmation_tag, Order, OrderMetadata};

/// Looks for an order a payment confirmation already produced.
///
/// Best effort only: there is no lock between the check and the create that
/// follows it, and `None` means "not observed yet", not "absent".
#[derive(Clone)]
pub struct IdempotencyGuard {
  backend: Arc<dyn CommerceBackend>,
}

impl IdempotencyGuard {
  pub fn new(backend: Arc<dyn CommerceBackend>) -> Self {
    Self { backend }
  }

  #[instrument(name = "idempotency::find_existing", skip(self), err(Display))]
  pub async fn find_existing(&self, confirmation_id: &str) -> Result<Option<Order>, BackendError> {
    let tag = confirmation_tag(confirmation_id);
    let tagged = self.backend.find_orders_by_tag(&tag).await?;
    if tagged.len() > 1 {
      warn!(
        count = tagged.len(),
        "More than one order carries this confirmation tag; using the oldest."
      );
    }
    let existing = tagged
      .into_iter()
      .min_by(|a, b| a.created_at.cmp(&b.created_at).then(a.order_number.cmp(&b.order_number)));
    debug!(found = existing.is_some(), "Idempotency lookup finished.");
    Ok(existing)
  }

  /// Finds the order an earlier delivery of `confirmation_id` created but
  /// never tagged: created for this confirmation (per its creation note),
  /// same customer, within `window`, same variants and quantities, and no
  /// confirmation tag of any payment.
  ///
  /// Another payment's untagged order never matches, even from the same
  /// customer buying the same items.
  #[instrument(name = "idempotency::find_untagged_match", skip(self, metadata), err(Display))]
  pub async fn find_untagged_match(
    &self,
    metadata: &OrderMetadata,
    confirmation_id: &str,
    window: Duration,
  ) -> Result<Option<Order>, BackendError> {
    let window = chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::hours(1));
    let since = Utc::now() - window;
    let wanted = metadata.item_signature();

    let mut candidates: Vec<Order> = self
      .backend
      .recent_orders_by_email(&metadata.customer_email, since)
      .await?
      .into_iter()
      .filter(|o| o.created_for(confirmation_id))
      .filter(|o| !o.has_any_confirmation_tag() && o.item_signature() == wanted)
      .collect();
    if candidates.len() > 1 {
      warn!(
        count = candidates.len(),
        order_ids = ?candidates.iter().map(|o| o.id.as_str()).collect::<Vec<_>>(),
        "Several untagged orders were created for this payment; picking the most recent."
      );
    }
    candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(candidates.into_iter().next())
  }
}
