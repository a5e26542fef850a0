/*
 * Responsibility
 * - The "authenticated caller" type handlers see
 * - Built by the access middleware from a verified token, stored in request extensions
 *
 * Notes
 * - Token parsing / signature checks belong to services::auth
 * - Role checks here are coarse; finer policy belongs to the handler
 */

use crate::error::AppError;
use crate::services::auth::AuthorizationContext;

/// Context attached to an authenticated request.
///
/// - `principal` is the name the token was issued for
/// - `roles` are the authorities granted at login
/// - `jti` is for log correlation only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCtx {
    pub principal: String,
    pub roles: Vec<String>,
    pub jti: Option<String>,
    pub expires_at: i64,
}

impl AuthCtx {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// 403 unless the caller holds `role`.
    pub fn require_role(&self, role: &str) -> Result<(), AppError> {
        if self.has_role(role) {
            Ok(())
        } else {
            tracing::info!(principal = %self.principal, required = role, "missing role");
            Err(AppError::Forbidden)
        }
    }
}

impl From<AuthorizationContext> for AuthCtx {
    fn from(ctx: AuthorizationContext) -> Self {
        Self {
            principal: ctx.principal,
            roles: ctx.roles,
            jti: ctx.token_id,
            expires_at: ctx.expires_at,
        }
    }
}
