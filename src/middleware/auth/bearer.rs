use axum::http::{HeaderMap, header};

use crate::services::auth::TokenError;

/// Scheme prefix recognised in `Authorization` headers.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Extract the raw token from `Authorization: Bearer <token>`.
///
/// `None` means no bearer credential was presented (header missing or another
/// scheme): the request proceeds unauthenticated. Once the prefix matches the
/// credential counts as presented, so a remainder that is not ASCII is
/// `Some(Err(MalformedToken))`. `Bearer ` with nothing after it yields
/// `Some(Ok(""))`, which the verifier rejects as an empty token.
pub fn bearer_token(headers: &HeaderMap) -> Option<Result<&str, TokenError>> {
    let rest = headers
        .get(header::AUTHORIZATION)?
        .as_bytes()
        .strip_prefix(BEARER_PREFIX.as_bytes())?;

    if !rest.is_ascii() {
        return Some(Err(TokenError::MalformedToken));
    }
    Some(std::str::from_utf8(rest).map_err(|_| TokenError::MalformedToken))
}
