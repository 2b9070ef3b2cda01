// storefront/src/web/handlers/mod.rs

pub mod order_lookup_handlers;
pub mod payment_intent_handlers;
pub mod webhook_handlers;
