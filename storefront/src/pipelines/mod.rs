// storefront/src/pipelines/mod.rs

//! The request flows that run on the `orderflow` engine.

use crate::errors::AppError;
use crate::state::AppState;
use orderflow::Registry;
use std::sync::Arc;

pub mod contexts;
pub mod payment_intent_pipeline;
pub mod webhook_pipeline;

/// Registers every pipeline with `registry`. Called once while building [`AppState`].
pub fn register_all_pipelines(registry: &Arc<Registry<AppError>>, app_state: &AppState) {
  tracing::info!("Registering pipelines...");
  webhook_pipeline::register_webhook_pipeline(registry, app_state);
  payment_intent_pipeline::register_payment_intent_pipeline(registry, app_state);
  tracing::info!("All application pipelines registered.");
}
