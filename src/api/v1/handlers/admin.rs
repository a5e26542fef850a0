use axum::Json;
use serde_json::{Value, json};

use crate::api::v1::extractors::AuthCtxExtractor;
use crate::error::AppError;

pub const ADMIN_ROLE: &str = "ADMIN";

/// GET /admin: only callers holding `ADMIN`.
pub async fn admin(AuthCtxExtractor(ctx): AuthCtxExtractor) -> Result<Json<Value>, AppError> {
    ctx.require_role(ADMIN_ROLE)?;
    Ok(Json(json!({ "principal": ctx.principal, "access": "granted" })))
}
