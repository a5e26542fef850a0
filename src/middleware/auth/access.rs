//! Bearer token verification → AuthCtx in request extensions.
//!
//! - No `Authorization: Bearer ...` header: the request continues unauthenticated
//!   (handlers that need a caller use `AuthCtxExtractor`, which answers 401).
//! - Bearer token present but rejected (including non-ASCII bytes after the
//!   prefix): 401 with the rejection code.
//! - Bearer token verified: `AuthCtx` is inserted for the rest of this request only.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::middleware::auth::bearer_token;
use crate::state::AppState;

/// Attach token verification to every route of `router`.
///
/// ```ignore
/// let protected = middleware::auth::access::apply(protected, state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8's from_fn cannot take a State extractor, so pass state via `from_fn_with_state`
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let presented = bearer_token(req.headers()).map(|r| r.map(str::to_owned));
    let token = match presented {
        None => return Ok(next.run(req).await),
        Some(Ok(token)) => token,
        Some(Err(err)) => {
            tracing::warn!(reason = err.code(), "token rejected: {err}");
            return Err(err.into());
        }
    };

    // Rejections are logged (kind only) inside the verifier.
    let ctx = state.verifier.verify(token.as_str())?;

    tracing::debug!(principal = %ctx.principal, roles = ?ctx.roles, "request authenticated");
    req.extensions_mut().insert(AuthCtx::from(ctx));

    Ok(next.run(req).await)
}
