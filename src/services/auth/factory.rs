/// Factory: build the token issuer and verifier from application `Config`.
use std::sync::Arc;

use crate::config::{AuthConfig, ConfigError};
use crate::services::auth::clock::{Clock, SystemClock};
use crate::services::auth::jwt::SigningKeys;
use crate::services::auth::token_issuer::TokenIssuer;
use crate::services::auth::token_verifier::TokenVerifier;

pub fn build_token_services(
    config: &AuthConfig,
) -> Result<(Arc<TokenIssuer>, Arc<TokenVerifier>), ConfigError> {
    build_token_services_with_clock(config, Arc::new(SystemClock))
}

/// Both halves share the same keys, claims layout and clock.
pub fn build_token_services_with_clock(
    config: &AuthConfig,
    clock: Arc<dyn Clock>,
) -> Result<(Arc<TokenIssuer>, Arc<TokenVerifier>), ConfigError> {
    let keys = SigningKeys::new(config.signing_algorithm, &config.secret_key)
        .ok_or(ConfigError::Invalid("AUTH_SIGNING_ALGORITHM"))?;

    let issuer = TokenIssuer::new(
        keys.clone(),
        config.claims_format,
        config.token_ttl_seconds,
        config.issuer.clone(),
        clock.clone(),
    );
    let verifier = TokenVerifier::new(
        keys,
        config.claims_format,
        config.token_leeway_seconds,
        config.issuer.clone(),
        clock,
    );

    Ok((Arc::new(issuer), Arc::new(verifier)))
}
