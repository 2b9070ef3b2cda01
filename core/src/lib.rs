// src/lib.rs

//! orderflow: a small asynchronous step-pipeline engine.
//!
//! A pipeline is an ordered list of named steps. Each step runs its `before`,
//! `on` and `after` handlers in that order; every handler receives a clone of
//! the shared [`ContextData`] and answers with [`PipelineControl::Continue`] or
//! [`PipelineControl::Stop`]. The first handler error ends the run.
//!
//! The storefront uses one pipeline per request flow (webhook reconciliation,
//! payment-intent creation) and keeps them in a [`Registry`] keyed by the
//! context type, so an HTTP handler only has to build the context and call
//! `registry.run(ctx)`.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context::Handler;
pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::Registry;
