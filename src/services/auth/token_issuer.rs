use std::{fmt, sync::Arc};

use uuid::Uuid;

use crate::services::auth::claims::{ClaimsFormat, IssuedClaims};
use crate::services::auth::clock::Clock;
use crate::services::auth::identity::{EncodingError, Identity};
use crate::services::auth::jwt::SigningKeys;

/// A freshly signed bearer token.
#[derive(Clone, Debug)]
pub struct IssuedToken {
    pub token: String,
    /// Always "Bearer"
    pub token_type: &'static str,
    /// Seconds until expiry.
    pub expires_in: u64,
    /// Unix seconds.
    pub expires_at: i64,
}

impl IssuedToken {
    /// Value for an `Authorization` response header.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.token)
    }
}

/// Signs time-bounded tokens for identities that already passed credential
/// verification.
#[derive(Clone)]
pub struct TokenIssuer {
    keys: SigningKeys,
    format: ClaimsFormat,
    ttl_seconds: u64,
    issuer: Option<String>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("keys", &self.keys)
            .field("format", &self.format)
            .field("ttl_seconds", &self.ttl_seconds)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl TokenIssuer {
    pub fn new(
        keys: SigningKeys,
        format: ClaimsFormat,
        ttl_seconds: u64,
        issuer: Option<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            keys,
            format,
            ttl_seconds,
            issuer,
            clock,
        }
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Issue a token for `identity`.
    ///
    /// Layout problems (e.g. a `-` in the principal under the delimited
    /// format) are reported before anything is signed.
    pub fn issue(&self, identity: &Identity) -> Result<IssuedToken, EncodingError> {
        let (sub, roles) = self.format.encode(identity)?;

        let now = self.clock.now();
        let exp = now.saturating_add(i64::try_from(self.ttl_seconds).unwrap_or(i64::MAX));

        let claims = IssuedClaims {
            sub,
            roles,
            exp,
            iat: now,
            jti: Uuid::new_v4().to_string(),
            iss: self.issuer.as_deref(),
        };

        let token = self.keys.sign(&claims)?;

        Ok(IssuedToken {
            token,
            token_type: "Bearer",
            expires_in: self.ttl_seconds,
            expires_at: exp,
        })
    }

    /// Validate raw strings into an [`Identity`] and issue a token for it.
    pub fn issue_for<I, S>(&self, principal: &str, roles: I) -> Result<IssuedToken, EncodingError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let identity = Identity::new(principal, roles)?;
        self.issue(&identity)
    }
}
