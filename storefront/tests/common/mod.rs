// storefront/tests/common/mod.rs
#![allow(dead_code)]

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;

use storefront::config::AppConfig;
use storefront::models::{LineItem, OrderMetadata, ShippingAddress};
use storefront::services::cart::{CartSnapshot, CartStore, InMemoryCartStore};
use storefront::services::commerce_mock::InMemoryCommerceBackend;
use storefront::services::metadata_codec;
use storefront::services::payment_mock::MockPaymentProcessor;
use storefront::services::signature;
use storefront::state::AppState;

pub const SECRET: &str = "whsec_integration_secret";
pub const WEBHOOK_URI: &str = "/api/v1/webhooks/payments";

static TRACING: Lazy<()> = Lazy::new(|| {
  let filter = tracing_subscriber::EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,storefront=debug"));
  tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().init();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}

pub struct Harness {
  pub state: AppState,
  pub commerce: Arc<InMemoryCommerceBackend>,
  pub payments: Arc<MockPaymentProcessor>,
  pub carts: Arc<InMemoryCartStore>,
}

pub fn test_config() -> AppConfig {
  let vars: HashMap<&str, &str> = [("PAYMENT_WEBHOOK_SECRET", SECRET)].into_iter().collect();
  AppConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).expect("test config")
}

pub fn harness() -> Harness {
  setup_tracing();
  let commerce = Arc::new(InMemoryCommerceBackend::new());
  let payments = Arc::new(MockPaymentProcessor::new());
  let carts = Arc::new(InMemoryCartStore::new());
  let state = AppState::new(test_config(), commerce.clone(), payments.clone(), carts.clone());
  Harness {
    state,
    commerce,
    payments,
    carts,
  }
}

/// Stores cart `cart_id` holding the shirt line, as the storefront would
/// have before checkout.
pub fn seed_cart(h: &Harness, cart_id: &str) {
  let snapshot = CartSnapshot {
    line_items: shirt_metadata(None).line_items,
    ..CartSnapshot::empty(cart_id)
  };
  h.carts.persist(&snapshot).expect("seed cart");
}

pub fn shirt_metadata(cart_id: Option<&str>) -> OrderMetadata {
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
    cart_id: cart_id.map(str::to_string),
  }
}

/// Event body as the processor would send it, with the metadata bag encoded.
pub fn event_body(event_type: &str, confirmation_id: &str, metadata: &OrderMetadata) -> Vec<u8> {
  let bag = metadata_codec::encode(metadata).expect("encode metadata");
  serde_json::to_vec(&serde_json::json!({
    "id": format!("evt_{}", confirmation_id),
    "type": event_type,
    "created": chrono::Utc::now().timestamp(),
    "data": { "object": { "id": confirmation_id, "metadata": bag } }
  }))
  .expect("serialize event")
}

pub fn sign(body: &[u8]) -> String {
  signature::sign_header(body, SECRET, chrono::Utc::now().timestamp()).expect("sign")
}
