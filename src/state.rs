/*
 * Responsibility
 * - Shared context handed to the Router (AppState)
 * - Clone is cheap (everything behind Arc); nothing in here is mutated after startup
 */
use std::sync::Arc;

use crate::services::auth::{TokenIssuer, TokenVerifier};
use crate::services::users::UserDirectory;

#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<TokenIssuer>,
    pub verifier: Arc<TokenVerifier>,
    pub users: Arc<dyn UserDirectory>,
}

impl AppState {
    pub fn new(
        issuer: Arc<TokenIssuer>,
        verifier: Arc<TokenVerifier>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            issuer,
            verifier,
            users,
        }
    }
}
