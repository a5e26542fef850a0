use axum::Json;

use crate::api::v1::dto::me_response::MeResponse;
use crate::api::v1::extractors::AuthCtxExtractor;

/// GET /me: who the presented token says the caller is.
pub async fn me(AuthCtxExtractor(ctx): AuthCtxExtractor) -> Json<MeResponse> {
    Json(MeResponse::from(ctx))
}
