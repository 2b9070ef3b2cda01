// storefront/src/services/metadata_codec.rs

//! The only place the processor's flat `string -> string` metadata bag is
//! read or written. Nested values are JSON-encoded into single strings.

use std::collections::HashMap;
use thiserror::Error;

use crate::models::{LineItem, OrderMetadata, ShippingAddress};

pub const KEY_CUSTOMER_EMAIL: &str = "customer_email";
pub const KEY_LINE_ITEMS: &str = "line_items";
pub const KEY_SHIPPING_ADDRESS: &str = "shipping_address";
pub const KEY_CART_ID: &str = "cart_id";

pub type MetadataBag = HashMap<String, String>;

#[derive(Debug, Error)]
pub enum DecodeError {
  #[error("metadata field '{0}' is missing")]
  MissingField(&'static str),
  #[error("metadata field '{field}' is not valid JSON: {source}")]
  InvalidJson {
    field: &'static str,
    #[source]
    source: serde_json::Error,
  },
  #[error("metadata field '{field}' is invalid: {reason}")]
  InvalidField { field: &'static str, reason: String },
}

pub fn encode(metadata: &OrderMetadata) -> Result<MetadataBag, serde_json::Error> {
  let mut bag = MetadataBag::with_capacity(4);
  bag.insert(KEY_CUSTOMER_EMAIL.to_string(), metadata.customer_email.clone());
  bag.insert(KEY_LINE_ITEMS.to_string(), serde_json::to_string(&metadata.line_items)?);
  bag.insert(
    KEY_SHIPPING_ADDRESS.to_string(),
    serde_json::to_string(&metadata.shipping_address)?,
  );
  if let Some(cart_id) = &metadata.cart_id {
    bag.insert(KEY_CART_ID.to_string(), cart_id.clone());
  }
  Ok(bag)
}

fn required<'a>(bag: &'a MetadataBag, field: &'static str) -> Result<&'a str, DecodeError> {
  bag.get(field).map(String::as_str).ok_or(DecodeError::MissingField(field))
}

fn json_field<T: serde::de::DeserializeOwned>(bag: &MetadataBag, field: &'static str) -> Result<T, DecodeError> {
  serde_json::from_str(required(bag, field)?).map_err(|source| DecodeError::InvalidJson { field, source })
}

pub fn decode(bag: &MetadataBag) -> Result<OrderMetadata, DecodeError> {
  let customer_email = required(bag, KEY_CUSTOMER_EMAIL)?.to_string();
  if customer_email.trim().is_empty() {
    return Err(DecodeError::InvalidField {
      field: KEY_CUSTOMER_EMAIL,
      reason: "empty".to_string(),
    });
  }

  let line_items: Vec<LineItem> = json_field(bag, KEY_LINE_ITEMS)?;
  if line_items.is_empty() {
    return Err(DecodeError::InvalidField {
      field: KEY_LINE_ITEMS,
      reason: "no line items".to_string(),
    });
  }
  if let Some(bad) = line_items
    .iter()
    .find(|li| li.quantity == 0 || !li.unit_price.is_finite() || li.unit_price < 0.0)
  {
    return Err(DecodeError::InvalidField {
      field: KEY_LINE_ITEMS,
      reason: format!("variant '{}' has quantity {} at {}", bad.variant_id, bad.quantity, bad.unit_price),
    });
  }

  let shipping_address: ShippingAddress = json_field(bag, KEY_SHIPPING_ADDRESS)?;
  let cart_id = bag.get(KEY_CART_ID).cloned();

  Ok(OrderMetadata {
    customer_email,
    line_items,
    shipping_address,
    cart_id,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn shirt_order() -> OrderMetadata {
    OrderMetadata {
      customer_email: "a@b.com".to_string(),
      line_items: vec![LineItem {
        variant_id: "v1".to_string(),
        quantity: 2,
        title: "Shirt".to_string(),
        unit_price: 20.0,
      }],
      shipping_address: ShippingAddress {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        address1: "1 Main St".to_string(),
        city: "X".to_string(),
        country: "GB".to_string(),
        zip: "N1".to_string(),
        ..Default::default()
      },
      cart_id: Some("c1".to_string()),
    }
  }

  #[test]
  fn encoded_bag_is_flat_strings() {
    let bag = encode(&shirt_order()).unwrap();
    assert_eq!(bag[KEY_CUSTOMER_EMAIL], "a@b.com");
    assert_eq!(bag[KEY_CART_ID], "c1");
    assert!(bag[KEY_LINE_ITEMS].starts_with('['));
    assert!(bag[KEY_SHIPPING_ADDRESS].contains("\"city\":\"X\""));
  }

  #[test]
  fn shirt_order_survives_the_bag() {
    let original = shirt_order();
    let decoded = decode(&encode(&original).unwrap()).unwrap();
    assert_eq!(decoded, original);
    assert_eq!(decoded.line_items[0].quantity, 2);
    assert_eq!(decoded.shipping_address.city, "X");
  }

  #[test]
  fn absent_cart_id_stays_absent() {
    let mut m = shirt_order();
    m.cart_id = None;
    let bag = encode(&m).unwrap();
    assert!(!bag.contains_key(KEY_CART_ID));
    assert_eq!(decode(&bag).unwrap(), m);
  }

  #[test]
  fn empty_cart_id_survives_the_bag() {
    let mut m = shirt_order();
    m.cart_id = Some(String::new());
    let bag = encode(&m).unwrap();
    assert_eq!(bag[KEY_CART_ID], "");
    assert_eq!(decode(&bag).unwrap(), m);
  }

  #[test]
  fn fractional_prices_are_preserved() {
    let mut m = shirt_order();
    m.line_items[0].unit_price = 19.99;
    assert_eq!(decode(&encode(&m).unwrap()).unwrap().line_items[0].unit_price, 19.99);
  }

  #[test]
  fn missing_keys_are_reported_by_name() {
    let mut bag = encode(&shirt_order()).unwrap();
    bag.remove(KEY_SHIPPING_ADDRESS);
    assert!(matches!(decode(&bag), Err(DecodeError::MissingField(KEY_SHIPPING_ADDRESS))));
  }

  #[test]
  fn broken_json_is_invalid_json() {
    let mut bag = encode(&shirt_order()).unwrap();
    bag.insert(KEY_LINE_ITEMS.to_string(), "[{\"variantId\":".to_string());
    assert!(matches!(
      decode(&bag),
      Err(DecodeError::InvalidJson { field: KEY_LINE_ITEMS, .. })
    ));
  }

  #[test]
  fn empty_line_items_are_rejected() {
    let mut bag = encode(&shirt_order()).unwrap();
    bag.insert(KEY_LINE_ITEMS.to_string(), "[]".to_string());
    assert!(matches!(decode(&bag), Err(DecodeError::InvalidField { .. })));
  }
}
