// storefront/src/services/cart.rs

//! Cart persistence with a single write path.
//!
//! All mutation goes through a [`CartSession`]. The session writes the cart
//! once when it ends: explicitly via [`CartSession::commit`], or on drop if
//! the caller returned early.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use crate::models::LineItem;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
  pub cart_id: String,
  pub line_items: Vec<LineItem>,
  pub updated_at: DateTime<Utc>,
}

impl CartSnapshot {
  pub fn empty(cart_id: &str) -> Self {
    Self {
      cart_id: cart_id.to_string(),
      line_items: Vec::new(),
      updated_at: Utc::now(),
    }
  }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
  #[error("cart store unavailable: {0}")]
  Unavailable(String),
}

/// Synchronous on purpose: [`CartSession`] persists from `Drop`.
pub trait CartStore: Send + Sync {
  fn load(&self, cart_id: &str) -> Result<Option<CartSnapshot>, CartError>;
  fn persist(&self, snapshot: &CartSnapshot) -> Result<(), CartError>;
}

#[derive(Default)]
pub struct InMemoryCartStore {
  carts: RwLock<HashMap<String, CartSnapshot>>,
  writes: AtomicUsize,
  fail_next: AtomicBool,
}

impl InMemoryCartStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn writes(&self) -> usize {
    self.writes.load(Ordering::SeqCst)
  }

  pub fn fail_next_write(&self) {
    self.fail_next.store(true, Ordering::SeqCst);
  }
}

impl CartStore for InMemoryCartStore {
  fn load(&self, cart_id: &str) -> Result<Option<CartSnapshot>, CartError> {
    Ok(self.carts.read().get(cart_id).cloned())
  }

  fn persist(&self, snapshot: &CartSnapshot) -> Result<(), CartError> {
    self.writes.fetch_add(1, Ordering::SeqCst);
    if self.fail_next.swap(false, Ordering::SeqCst) {
      return Err(CartError::Unavailable("injected write failure".to_string()));
    }
    self
      .carts
      .write()
      .insert(snapshot.cart_id.clone(), snapshot.clone());
    Ok(())
  }
}

/// Scope guard over one cart. Persists at most once, and only if modified.
pub struct CartSession {
  store: Arc<dyn CartStore>,
  snapshot: CartSnapshot,
  dirty: bool,
}

impl CartSession {
  pub fn open(store: Arc<dyn CartStore>, cart_id: &str) -> Result<Self, CartError> {
    let snapshot = store.load(cart_id)?.unwrap_or_else(|| CartSnapshot::empty(cart_id));
    Ok(Self {
      store,
      snapshot,
      dirty: false,
    })
  }

  /// Empties the cart. A cart that is already empty stays clean.
  pub fn clear(&mut self) {
    if !self.snapshot.line_items.is_empty() {
      self.snapshot.line_items.clear();
      self.touch();
    }
  }

  fn touch(&mut self) {
    self.snapshot.updated_at = Utc::now();
    self.dirty = true;
  }

  fn persist(&mut self) -> Result<(), CartError> {
    if !self.dirty {
      return Ok(());
    }
    // Cleared before the write so a failed commit is not retried from Drop.
    self.dirty = false;
    self.store.persist(&self.snapshot)
  }

  /// Ends the session, writing the cart if it changed and reporting the result.
  pub fn commit(mut self) -> Result<(), CartError> {
    self.persist()
  }
}

impl Drop for CartSession {
  fn drop(&mut self) {
    if self.dirty {
      debug!(cart_id = %self.snapshot.cart_id, "Persisting cart on scope exit.");
      if let Err(e) = self.persist() {
        error!(cart_id = %self.snapshot.cart_id, error = %e, "Cart could not be persisted.");
      }
    }
  }
}
