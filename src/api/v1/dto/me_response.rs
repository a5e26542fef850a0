use serde::Serialize;

use crate::api::v1::extractors::AuthCtx;

#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    pub principal: String,
    pub roles: Vec<String>,
    /// Unix seconds.
    pub expires_at: i64,
}

impl From<AuthCtx> for MeResponse {
    fn from(ctx: AuthCtx) -> Self {
        Self {
            principal: ctx.principal,
            roles: ctx.roles,
            expires_at: ctx.expires_at,
        }
    }
}
