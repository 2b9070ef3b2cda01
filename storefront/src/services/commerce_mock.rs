// storefront/src/services/commerce_mock.rs

//! In-memory commerce backend for local runs and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use super::commerce::{BackendError, CommerceBackend};
use crate::models::{NewOrder, Order};

const FIRST_ORDER_NUMBER: u64 = 1001;

#[derive(Default)]
struct Store {
  orders: Vec<Order>,
  next_number: u64,
  stock: HashMap<String, i64>,
}

#[derive(Default)]
struct Faults {
  create: Option<BackendError>,
  tag: Vec<BackendError>,
  lookup: Option<BackendError>,
}

/// Keeps orders in a `Vec` behind a mutex. Counts calls and can be told to
/// fail upcoming requests so tests can walk every failure branch.
#[derive(Default)]
pub struct InMemoryCommerceBackend {
  store: Mutex<Store>,
  faults: Mutex<Faults>,
  latency: Option<Duration>,
  create_calls: AtomicUsize,
  tag_calls: AtomicUsize,
  tag_lookup_calls: AtomicUsize,
  email_lookup_calls: AtomicUsize,
}

impl InMemoryCommerceBackend {
  pub fn new() -> Self {
    Self::default()
  }

  /// Every call sleeps for `latency` first, which widens race windows in tests.
  pub fn with_latency(latency: Duration) -> Self {
    Self {
      latency: Some(latency),
      ..Self::default()
    }
  }

  pub fn set_stock(&self, variant_id: &str, quantity: i64) {
    self.store.lock().stock.insert(variant_id.to_string(), quantity);
  }

  pub fn stock(&self, variant_id: &str) -> Option<i64> {
    self.store.lock().stock.get(variant_id).copied()
  }

  pub fn fail_next_create(&self, err: BackendError) {
    self.faults.lock().create = Some(err);
  }

  /// Queues a failure for the next tag call. Queue several to fail a repair too.
  pub fn fail_next_tag(&self, err: BackendError) {
    self.faults.lock().tag.push(err);
  }

  pub fn fail_next_lookup(&self, err: BackendError) {
    self.faults.lock().lookup = Some(err);
  }

  /// Inserts an order directly, bypassing counters and faults.
  pub fn seed_order(&self, order: Order) -> Order {
    let mut store = self.store.lock();
    store.next_number = store.next_number.max(order.order_number + 1);
    store.orders.push(order.clone());
    order
  }

  pub fn orders(&self) -> Vec<Order> {
    self.store.lock().orders.clone()
  }

  pub fn orders_tagged(&self, tag: &str) -> Vec<Order> {
    self.store.lock().orders.iter().filter(|o| o.has_tag(tag)).cloned().collect()
  }

  pub fn create_calls(&self) -> usize {
    self.create_calls.load(Ordering::SeqCst)
  }

  pub fn tag_calls(&self) -> usize {
    self.tag_calls.load(Ordering::SeqCst)
  }

  pub fn tag_lookup_calls(&self) -> usize {
    self.tag_lookup_calls.load(Ordering::SeqCst)
  }

  pub fn email_lookup_calls(&self) -> usize {
    self.email_lookup_calls.load(Ordering::SeqCst)
  }

  async fn simulate_latency(&self) {
    if let Some(latency) = self.latency {
      tokio::time::sleep(latency).await;
    }
  }
}

#[async_trait]
impl CommerceBackend for InMemoryCommerceBackend {
  async fn find_orders_by_tag(&self, tag: &str) -> Result<Vec<Order>, BackendError> {
    self.tag_lookup_calls.fetch_add(1, Ordering::SeqCst);
    self.simulate_latency().await;
    if let Some(err) = self.faults.lock().lookup.take() {
      return Err(err);
    }
    Ok(self.orders_tagged(tag))
  }

  #[instrument(name = "commerce_mock::create_order", skip(self, order), fields(email = %order.email))]
  async fn create_order(&self, order: NewOrder) -> Result<Order, BackendError> {
    self.create_calls.fetch_add(1, Ordering::SeqCst);
    self.simulate_latency().await;
    if let Some(err) = self.faults.lock().create.take() {
      return Err(err);
    }

    let mut store = self.store.lock();
    if order.decrement_inventory {
      for item in &order.line_items {
        if let Some(level) = store.stock.get_mut(&item.variant_id) {
          *level -= i64::from(item.quantity);
        }
      }
    }
    let order_number = store.next_number.max(FIRST_ORDER_NUMBER);
    store.next_number = order_number + 1;
    let created = Order {
      id: format!("order_{}", Uuid::new_v4().simple()),
      order_number,
      email: order.email,
      financial_status: order.financial_status,
      fulfillment_status: order.fulfillment_status,
      line_items: order.line_items,
      shipping_address: order.shipping_address,
      tags: BTreeSet::new(),
      note: order.note,
      created_at: Utc::now(),
    };
    store.orders.push(created.clone());
    info!(order_id = %created.id, order_number, "Mock backend created order.");
    Ok(created)
  }

  async fn add_tags(&self, order_id: &str, tags: &[String]) -> Result<(), BackendError> {
    self.tag_calls.fetch_add(1, Ordering::SeqCst);
    self.simulate_latency().await;
    {
      let mut faults = self.faults.lock();
      if !faults.tag.is_empty() {
        return Err(faults.tag.remove(0));
      }
    }

    let mut store = self.store.lock();
    let order = store
      .orders
      .iter_mut()
      .find(|o| o.id == order_id)
      .ok_or_else(|| BackendError::Status {
        status: 404,
        body: format!("order {} not found", order_id),
      })?;
    order.tags.extend(tags.iter().cloned());
    Ok(())
  }

  async fn recent_orders_by_email(&self, email: &str, since: DateTime<Utc>) -> Result<Vec<Order>, BackendError> {
    self.email_lookup_calls.fetch_add(1, Ordering::SeqCst);
    self.simulate_latency().await;
    let store = self.store.lock();
    let mut found: Vec<Order> = store
      .orders
      .iter()
      .filter(|o| o.email.eq_ignore_ascii_case(email) && o.created_at >= since)
      .cloned()
      .collect();
    found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(found)
  }
}
