// storefront/src/services/commerce.rs

//! Port to the commerce backend that owns orders, plus its REST adapter.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::models::{NewOrder, Order};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
  #[error("backend responded with status {status}: {body}")]
  Status { status: u16, body: String },
  #[error("backend request timed out")]
  Timeout,
  #[error("backend transport failure: {0}")]
  Transport(String),
  #[error("backend returned an unreadable response: {0}")]
  InvalidResponse(String),
}

impl BackendError {
  /// HTTP status of the backend's reply, when there was one.
  pub fn status(&self) -> Option<u16> {
    match self {
      BackendError::Status { status, .. } => Some(*status),
      _ => None,
    }
  }
}

impl From<reqwest::Error> for BackendError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      BackendError::Timeout
    } else if err.is_decode() {
      BackendError::InvalidResponse(err.to_string())
    } else {
      BackendError::Transport(err.to_string())
    }
  }
}

/// What the reconciliation code needs from the commerce backend.
///
/// Listing calls may be eventually consistent: an order that was just
/// created is not guaranteed to show up in `find_orders_by_tag` yet.
/// Listing calls return every matching order, across however many pages the
/// backend splits them into.
#[async_trait]
pub trait CommerceBackend: Send + Sync {
  async fn find_orders_by_tag(&self, tag: &str) -> Result<Vec<Order>, BackendError>;

  async fn create_order(&self, order: NewOrder) -> Result<Order, BackendError>;

  async fn add_tags(&self, order_id: &str, tags: &[String]) -> Result<(), BackendError>;

  /// Orders placed with `email` at or after `since`, newest first.
  async fn recent_orders_by_email(&self, email: &str, since: DateTime<Utc>) -> Result<Vec<Order>, BackendError>;
}

#[derive(Deserialize)]
struct OrdersEnvelope {
  orders: Vec<Order>,
}

#[derive(Deserialize)]
struct OrderEnvelope {
  order: Order,
}

#[derive(Serialize)]
struct CreateOrderBody<'a> {
  order: &'a NewOrder,
}

#[derive(Serialize)]
struct AddTagsBody<'a> {
  tags: &'a [String],
}

/// Orders requested per listing page.
const PAGE_SIZE: usize = 250;
/// Listing stops here even if the backend keeps returning full pages.
const MAX_PAGES: usize = 40;

/// REST adapter: `GET/POST {base}/orders`, `POST {base}/orders/{id}/tags`,
/// authenticated with an `X-Access-Token` header. Listings are paged with
/// `limit` and a 1-based `page`.
#[derive(Clone)]
pub struct HttpCommerceBackend {
  client: Client,
  base_url: String,
  access_token: String,
  page_size: usize,
}

impl HttpCommerceBackend {
  pub fn new(base_url: &str, access_token: &str, timeout: Duration) -> Result<Self, BackendError> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
      access_token: access_token.to_string(),
      page_size: PAGE_SIZE,
    })
  }

  async fn check(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
      status: status.as_u16(),
      body,
    })
  }

  /// Reads pages until one comes back short.
  async fn list(&self, query: &[(&str, &str)]) -> Result<Vec<Order>, BackendError> {
    let limit = self.page_size.to_string();
    let mut orders = Vec::new();
    for page in 1..=MAX_PAGES {
      let response = self
        .client
        .get(format!("{}/orders", self.base_url))
        .header("X-Access-Token", &self.access_token)
        .query(&[("status", "any"), ("limit", limit.as_str())])
        .query(&[("page", page)])
        .query(query)
        .send()
        .await?;
      let envelope: OrdersEnvelope = Self::check(response).await?.json().await?;
      let fetched = envelope.orders.len();
      orders.extend(envelope.orders);
      if fetched < self.page_size {
        return Ok(orders);
      }
    }
    warn!(
      pages = MAX_PAGES,
      fetched = orders.len(),
      "Order listing hit the page limit; later pages were not read."
    );
    Ok(orders)
  }
}

#[async_trait]
impl CommerceBackend for HttpCommerceBackend {
  #[instrument(name = "commerce::find_orders_by_tag", skip(self), err(Display))]
  async fn find_orders_by_tag(&self, tag: &str) -> Result<Vec<Order>, BackendError> {
    let orders = self.list(&[("tag", tag)]).await?;
    // Some backends match tags by prefix; only exact hits count.
    let exact: Vec<Order> = orders.into_iter().filter(|o| o.has_tag(tag)).collect();
    debug!(found = exact.len(), "Tag lookup finished.");
    Ok(exact)
  }

  #[instrument(name = "commerce::create_order", skip(self, order), fields(email = %order.email), err(Display))]
  async fn create_order(&self, order: NewOrder) -> Result<Order, BackendError> {
    let response = self
      .client
      .post(format!("{}/orders", self.base_url))
      .header("X-Access-Token", &self.access_token)
      .json(&CreateOrderBody { order: &order })
      .send()
      .await?;
    let envelope: OrderEnvelope = Self::check(response).await?.json().await?;
    Ok(envelope.order)
  }

  #[instrument(name = "commerce::add_tags", skip(self), err(Display))]
  async fn add_tags(&self, order_id: &str, tags: &[String]) -> Result<(), BackendError> {
    let response = self
      .client
      .post(format!("{}/orders/{}/tags", self.base_url, order_id))
      .header("X-Access-Token", &self.access_token)
      .json(&AddTagsBody { tags })
      .send()
      .await?;
    Self::check(response).await?;
    Ok(())
  }

  #[instrument(name = "commerce::recent_orders_by_email", skip(self, email), err(Display))]
  async fn recent_orders_by_email(&self, email: &str, since: DateTime<Utc>) -> Result<Vec<Order>, BackendError> {
    let since = since.to_rfc3339_opts(SecondsFormat::Secs, true);
    match self.list(&[("email", email), ("created_at_min", &since)]).await {
      // A backend with no orders for this customer may answer 404.
      Err(BackendError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => Ok(Vec::new()),
      other => other,
    }
  }
}
