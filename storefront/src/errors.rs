// storefront/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use orderflow::FlowError;
use serde_json::json;
use thiserror::Error;

use crate::services::commerce::BackendError;
use crate::services::materializer::MaterializeError;
use crate::services::metadata_codec::DecodeError;
use crate::services::payments::PaymentError;
use crate::services::signature::SignatureError;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Missing webhook signature header")]
  MissingSignature,

  #[error("Webhook signature rejected: {0}")]
  Signature(#[from] SignatureError),

  #[error("Malformed webhook event: {0}")]
  MalformedEvent(String),

  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Order metadata could not be decoded: {0}")]
  Decode(#[from] DecodeError),

  #[error("Order could not be materialized: {0}")]
  Materialize(#[from] MaterializeError),

  #[error("Payment processor error: {0}")]
  Payment(#[from] PaymentError),

  #[error("Commerce backend error: {0}")]
  Backend(#[from] BackendError),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    AppError::Internal(format!("{:#}", err))
  }
}

impl AppError {
  fn label(&self) -> &'static str {
    match self {
      AppError::MissingSignature | AppError::Signature(_) => "Invalid webhook signature",
      AppError::MalformedEvent(_) => "Malformed webhook event",
      AppError::Validation(_) => "Validation failed",
      AppError::Decode(_) => "Order metadata could not be decoded",
      AppError::Materialize(_) => "Order could not be created",
      AppError::Payment(PaymentError::Validation(_)) => "Validation failed",
      AppError::Payment(_) => "Payment provider error",
      AppError::Backend(_) => "Commerce backend error",
      AppError::Config(_) => "Configuration issue",
      AppError::Workflow { .. } => "Workflow processing error",
      AppError::Internal(_) => "An internal error occurred",
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      // 4xx tells the processor not to redeliver; the same bytes will fail again.
      AppError::MissingSignature
      | AppError::Signature(_)
      | AppError::MalformedEvent(_)
      | AppError::Validation(_)
      | AppError::Payment(PaymentError::Validation(_)) => StatusCode::BAD_REQUEST,
      AppError::Decode(_)
      | AppError::Materialize(_)
      | AppError::Payment(_)
      | AppError::Backend(_)
      | AppError::Config(_)
      | AppError::Workflow { .. }
      | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, status = status.as_u16(), "Responding with error");
    } else {
      tracing::warn!(application_error = %self, status = status.as_u16(), "Rejecting request");
    }
    HttpResponse::build(status).json(json!({"error": self.label(), "detail": self.to_string()}))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
