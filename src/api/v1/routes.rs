/*
 * Responsibility
 * - URL layout of v1
 * - /login stays outside the access middleware; everything else runs through it
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::v1::handlers::{admin::admin, login::login, me::me};
use crate::middleware::auth::access;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(me))
        .route("/admin", get(admin));

    Router::new()
        .route("/login", post(login))
        .merge(access::apply(protected, state))
}
