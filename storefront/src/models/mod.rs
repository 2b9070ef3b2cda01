// storefront/src/models/mod.rs

//! Data carried between the payment processor, the commerce backend and the
//! HTTP surface.

pub mod metadata;
pub mod order;
pub mod payment_intent;
pub mod webhook_event;

pub use metadata::{LineItem, OrderMetadata, ShippingAddress};
pub use order::{confirmation_tag, payment_note, FinancialStatus, FulfillmentStatus, NewOrder, Order, OrderRef, CONFIRMATION_TAG_PREFIX};
pub use payment_intent::{CreatePaymentIntentRequest, CreatePaymentIntentResponse};
pub use webhook_event::{EventType, WebhookEvent};
