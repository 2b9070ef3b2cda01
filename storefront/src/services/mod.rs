// storefront/src/services/mod.rs

pub mod cart;
pub mod commerce;
pub mod commerce_mock;
pub mod idempotency;
pub mod materializer;
pub mod metadata_codec;
pub mod payment_mock;
pub mod payments;
pub mod poller;
pub mod signature;
