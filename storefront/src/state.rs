// storefront/src/state.rs

use std::sync::Arc;
use tracing::info;

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::pipelines;
use crate::services::cart::{CartStore, InMemoryCartStore};
use crate::services::commerce::{CommerceBackend, HttpCommerceBackend};
use crate::services::commerce_mock::InMemoryCommerceBackend;
use crate::services::materializer::OrderMaterializer;
use crate::services::payment_mock::MockPaymentProcessor;
use crate::services::payments::{HttpPaymentProcessor, PaymentProcessor};
use orderflow::Registry;

/// Everything a request needs, built once by the entry point and cloned into
/// every handler. Clients are injected here and nowhere else.
#[derive(Clone)]
pub struct AppState {
  pub registry: Arc<Registry<AppError>>,
  pub config: Arc<AppConfig>,
  pub payments: Arc<dyn PaymentProcessor>,
  pub carts: Arc<dyn CartStore>,
  pub materializer: OrderMaterializer,
}

impl AppState {
  /// Wires the given collaborators together and registers every pipeline.
  pub fn new(
    config: AppConfig,
    commerce: Arc<dyn CommerceBackend>,
    payments: Arc<dyn PaymentProcessor>,
    carts: Arc<dyn CartStore>,
  ) -> Self {
    let materializer = OrderMaterializer::new(commerce, config.tag_recovery_window);
    let state = AppState {
      registry: Arc::new(Registry::<AppError>::new()),
      config: Arc::new(config),
      payments,
      carts,
      materializer,
    };
    pipelines::register_all_pipelines(&state.registry, &state);
    state
  }

  /// Picks HTTP clients when their URLs/keys are configured and in-memory
  /// stand-ins otherwise.
  pub fn from_config(config: AppConfig) -> Result<Self> {
    let commerce: Arc<dyn CommerceBackend> = match &config.commerce_api_url {
      Some(url) => Arc::new(
        HttpCommerceBackend::new(url, &config.commerce_access_token, config.backend_timeout)
          .map_err(|e| AppError::Config(format!("commerce client: {}", e)))?,
      ),
      None => {
        info!("COMMERCE_API_URL not set; using the in-memory commerce backend.");
        Arc::new(InMemoryCommerceBackend::new())
      }
    };
    let payments: Arc<dyn PaymentProcessor> = match &config.payment_api_key {
      Some(key) => Arc::new(
        HttpPaymentProcessor::new(&config.payment_api_base, key, config.backend_timeout)
          .map_err(|e| AppError::Config(format!("payment client: {}", e)))?,
      ),
      None => {
        info!("PAYMENT_API_KEY not set; using the in-memory payment processor.");
        Arc::new(MockPaymentProcessor::new())
      }
    };
    Ok(Self::new(config, commerce, payments, Arc::new(InMemoryCartStore::new())))
  }
}
