// storefront/src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::metadata::{item_signature, LineItem, ShippingAddress};

/// Tags of the form `payment_confirmation:<id>` mark which payment produced an order.
pub const CONFIRMATION_TAG_PREFIX: &str = "payment_confirmation:";

pub fn confirmation_tag(confirmation_id: &str) -> String {
  format!("{}{}", CONFIRMATION_TAG_PREFIX, confirmation_id)
}

const PAYMENT_NOTE_PREFIX: &str = "Paid via payment ";

/// Note written on every order at creation. It names the paying confirmation
/// before any tag exists, so an order whose tagging failed can still be
/// traced back to its payment.
pub fn payment_note(confirmation_id: &str) -> String {
  format!("{}{}", PAYMENT_NOTE_PREFIX, confirmation_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancialStatus {
  Pending,
  Paid,
  Refunded,
  Voided,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
  Unfulfilled,
  Partial,
  Fulfilled,
}

/// An order as the commerce backend reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
  pub id: String,
  /// The number shown to the customer, e.g. 1042 for "#1042".
  pub order_number: u64,
  pub email: String,
  pub financial_status: FinancialStatus,
  pub fulfillment_status: FulfillmentStatus,
  pub line_items: Vec<LineItem>,
  pub shipping_address: ShippingAddress,
  #[serde(default)]
  pub tags: BTreeSet<String>,
  #[serde(default)]
  pub note: Option<String>,
  pub created_at: DateTime<Utc>,
}

impl Order {
  pub fn reference(&self) -> OrderRef {
    OrderRef {
      order_id: self.id.clone(),
      order_number: self.order_number,
    }
  }

  pub fn has_tag(&self, tag: &str) -> bool {
    self.tags.contains(tag)
  }

  /// True when some payment confirmation has already claimed this order.
  pub fn has_any_confirmation_tag(&self) -> bool {
    self.tags.iter().any(|t| t.starts_with(CONFIRMATION_TAG_PREFIX))
  }

  /// True when the creation note names exactly this confirmation.
  pub fn created_for(&self, confirmation_id: &str) -> bool {
    self
      .note
      .as_deref()
      .and_then(|note| note.strip_prefix(PAYMENT_NOTE_PREFIX))
      .is_some_and(|id| id == confirmation_id)
  }

  pub fn item_signature(&self) -> Vec<(String, u32)> {
    item_signature(&self.line_items)
  }
}

/// The stable handle surfaced to the customer once an order exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRef {
  pub order_id: String,
  pub order_number: u64,
}

/// Order creation request sent to the commerce backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewOrder {
  pub email: String,
  pub line_items: Vec<LineItem>,
  pub shipping_address: ShippingAddress,
  pub financial_status: FinancialStatus,
  pub fulfillment_status: FulfillmentStatus,
  /// Ask the backend to decrement stock for the ordered variants.
  pub decrement_inventory: bool,
  /// Set to [`payment_note`] by the materializer.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub note: Option<String>,
}
