use axum::Form;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::FormRejection;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{info, warn};

use crate::api::v1::dto::{login_request::LoginRequest, token_response::TokenResponse};
use crate::error::AppError;
use crate::state::AppState;

/// POST /login
///
/// Checks the credentials against the user directory and, on success, returns
/// the token both as `Authorization: Bearer <token>` and in the JSON body.
pub async fn login(
    State(state): State<AppState>,
    form: Result<Form<LoginRequest>, FormRejection>,
) -> Result<Response, AppError> {
    let Form(req) = form.map_err(|rejection| AppError::InvalidRequest(rejection.body_text()))?;

    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidRequest(
            "username and password are required".to_string(),
        ));
    }

    let identity = match state.users.authenticate(&req.username, &req.password).await {
        Some(identity) => identity,
        None => {
            warn!(username = %req.username, "login failed");
            return Err(AppError::InvalidCredentials);
        }
    };

    let issued = state.issuer.issue(&identity)?;

    let authorization =
        HeaderValue::from_str(&issued.authorization_header()).map_err(|_| AppError::Internal)?;

    info!(
        principal = %identity.principal(),
        roles = ?identity.roles(),
        expires_at = issued.expires_at,
        "token issued"
    );

    Ok((
        StatusCode::OK,
        [(header::AUTHORIZATION, authorization)],
        Json(TokenResponse::from(issued)),
    )
        .into_response())
}
