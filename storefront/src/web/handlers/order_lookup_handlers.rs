// storefront/src/web/handlers/order_lookup_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupQuery {
  #[serde(default)]
  pub confirmation_id: Option<String>,
}

/// What the success page polls. Goes straight to the commerce backend every
/// time; caching headers are added by the route.
#[instrument(
  name = "handler::order_lookup",
  skip(app_state, req),
  fields(confirmation_id = tracing::field::Empty)
)]
pub async fn order_lookup_handler(app_state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
  let query = web::Query::<LookupQuery>::from_query(req.query_string())
    .map_err(|e| AppError::Validation(format!("invalid query: {}", e)))?;
  let confirmation_id = query
    .confirmation_id
    .as_deref()
    .map(str::trim)
    .filter(|id| !id.is_empty())
    .ok_or_else(|| AppError::Validation("confirmationId is required".to_string()))?;
  tracing::Span::current().record("confirmation_id", confirmation_id);

  match app_state.materializer.guard().find_existing(confirmation_id).await? {
    Some(order) => Ok(HttpResponse::Ok().json(order.reference())),
    None => Ok(HttpResponse::NotFound().json(json!({"status": "not_found"}))),
  }
}
