// storefront/src/models/metadata.rs

use serde::{Deserialize, Serialize};

/// One purchased variant as captured at payment-intent time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
  pub variant_id: String,
  pub quantity: u32,
  pub title: String,
  /// Price of a single unit in the shop currency's major unit.
  pub unit_price: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
  pub first_name: String,
  pub last_name: String,
  pub address1: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub address2: Option<String>,
  pub city: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub province: Option<String>,
  pub country: String,
  pub zip: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
}

/// Everything the webhook needs to build an order, carried through the
/// payment processor inside the intent's metadata bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMetadata {
  pub customer_email: String,
  pub line_items: Vec<LineItem>,
  pub shipping_address: ShippingAddress,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cart_id: Option<String>,
}

impl OrderMetadata {
  /// `(variant_id, quantity)` pairs in a stable order, used to compare an
  /// order's contents regardless of line ordering.
  pub fn item_signature(&self) -> Vec<(String, u32)> {
    item_signature(&self.line_items)
  }
}

pub fn item_signature(items: &[LineItem]) -> Vec<(String, u32)> {
  let mut sig: Vec<(String, u32)> = items.iter().map(|li| (li.variant_id.clone(), li.quantity)).collect();
  sig.sort();
  sig
}
