use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::services::auth::identity::{EncodingError, Identity};

const PRINCIPAL_DELIMITER: char = '-';
const ROLE_DELIMITER: &str = ",";

/// How principal and roles are laid out in the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClaimsFormat {
    /// `sub` is the principal, roles live in their own `roles` array claim.
    #[default]
    Structured,
    /// Legacy positional layout: `sub = "<principal>-<ROLE>,<ROLE>"`.
    Delimited,
}

impl FromStr for ClaimsFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structured" => Ok(Self::Structured),
            "delimited" | "legacy" => Ok(Self::Delimited),
            _ => Err(()),
        }
    }
}

/// Payload written by the issuer.
#[derive(Debug, Serialize)]
pub(crate) struct IssuedClaims<'a> {
    pub sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<&'a [String]>,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<&'a str>,
}

/// Payload read back by the verifier.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenClaims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub jti: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

impl ClaimsFormat {
    /// Returns the `sub` value and the `roles` claim for this layout.
    pub(crate) fn encode<'a>(
        &self,
        identity: &'a Identity,
    ) -> Result<(String, Option<&'a [String]>), EncodingError> {
        match self {
            Self::Structured => Ok((identity.principal().to_string(), Some(identity.roles()))),
            Self::Delimited => {
                let principal = identity.principal();
                if principal.contains(PRINCIPAL_DELIMITER) || principal.contains(ROLE_DELIMITER) {
                    return Err(EncodingError::DelimiterInPrincipal);
                }
                let roles = identity.roles().join(ROLE_DELIMITER);
                Ok((format!("{principal}{PRINCIPAL_DELIMITER}{roles}"), None))
            }
        }
    }

    /// Inverse of [`ClaimsFormat::encode`]. `None` when the claims do not
    /// describe a valid identity under this layout.
    pub(crate) fn decode(&self, sub: &str, roles: Option<Vec<String>>) -> Option<Identity> {
        match self {
            Self::Structured => Identity::new(sub, roles?).ok(),
            Self::Delimited => {
                if roles.is_some() {
                    return None;
                }
                let (principal, roles) = sub.split_once(PRINCIPAL_DELIMITER)?;
                if principal.contains(ROLE_DELIMITER) {
                    return None;
                }
                let roles: Vec<&str> = if roles.is_empty() {
                    Vec::new()
                } else {
                    roles.split(ROLE_DELIMITER).collect()
                };
                Identity::new(principal, roles).ok()
            }
        }
    }
}
