// storefront/src/models/payment_intent.rs

use serde::{Deserialize, Serialize};

use super::metadata::{LineItem, OrderMetadata, ShippingAddress};

/// Body of `POST /api/v1/payment-intents`, as sent by the checkout UI.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentRequest {
  /// Smallest currency unit (cents).
  pub amount: u64,
  pub currency: String,
  pub email: String,
  #[serde(default)]
  pub cart_id: Option<String>,
  pub line_items: Vec<LineItem>,
  pub shipping_address: ShippingAddress,
}

impl CreatePaymentIntentRequest {
  /// Returns the normalized request, or a message naming the first bad field.
  pub fn validate(mut self) -> Result<Self, String> {
    if self.amount == 0 {
      return Err("amount must be greater than zero".to_string());
    }
    self.email = self.email.trim().to_string();
    if self.email.is_empty() || !self.email.contains('@') {
      return Err("a valid email is required".to_string());
    }
    let currency = self.currency.trim();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
      return Err(format!("currency '{}' is not a three-letter code", self.currency));
    }
    self.currency = currency.to_ascii_lowercase();
    if self.line_items.is_empty() {
      return Err("at least one line item is required".to_string());
    }
    for li in &self.line_items {
      if li.quantity == 0 {
        return Err(format!("line item '{}' has zero quantity", li.variant_id));
      }
      if !li.unit_price.is_finite() || li.unit_price < 0.0 {
        return Err(format!("line item '{}' has an invalid price", li.variant_id));
      }
    }
    self.cart_id = self.cart_id.filter(|c| !c.trim().is_empty());
    Ok(self)
  }

  pub fn order_metadata(&self) -> OrderMetadata {
    OrderMetadata {
      customer_email: self.email.clone(),
      line_items: self.line_items.clone(),
      shipping_address: self.shipping_address.clone(),
      cart_id: self.cart_id.clone(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentResponse {
  pub client_secret: String,
  pub confirmation_id: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn request() -> CreatePaymentIntentRequest {
    CreatePaymentIntentRequest {
      amount: 4000,
      currency: "USD".to_string(),
      email: " a@b.com ".to_string(),
      cart_id: Some("".to_string()),
      line_items: vec![LineItem {
        variant_id: "v1".to_string(),
        quantity: 2,
        title: "Shirt".to_string(),
        unit_price: 20.0,
      }],
      shipping_address: ShippingAddress::default(),
    }
  }

  #[test]
  fn normalizes_currency_email_and_blank_cart() {
    let ok = request().validate().unwrap();
    assert_eq!(ok.currency, "usd");
    assert_eq!(ok.email, "a@b.com");
    assert_eq!(ok.cart_id, None);
  }

  #[test]
  fn rejects_bad_fields() {
    let mut r = request();
    r.amount = 0;
    assert!(r.validate().unwrap_err().contains("amount"));

    let mut r = request();
    r.email = "nobody".to_string();
    assert!(r.validate().unwrap_err().contains("email"));

    let mut r = request();
    r.currency = "dollars".to_string();
    assert!(r.validate().is_err());

    let mut r = request();
    r.line_items.clear();
    assert!(r.validate().is_err());

    let mut r = request();
    r.line_items[0].unit_price = -1.0;
    assert!(r.validate().is_err());
  }
}
