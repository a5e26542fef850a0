use thiserror::Error;

/// Longest role name accepted on either side of the token.
pub const MAX_ROLE_LEN: usize = 64;

/// Reasons an identity cannot be put into a token.
///
/// These are programming / configuration errors on the issuing side: they are
/// raised before anything is signed, so a partially encoded token never leaves
/// the issuer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("principal must not be empty")]
    EmptyPrincipal,

    #[error("principal contains control characters")]
    InvalidPrincipal,

    #[error("principal contains a subject delimiter ('-' or ',')")]
    DelimiterInPrincipal,

    #[error("invalid role name: {0:?}")]
    InvalidRole(String),

    #[error("duplicate role: {0}")]
    DuplicateRole(String),

    #[error("failed to sign token")]
    Signing,
}

/// A verified principal and its ordered set of roles.
///
/// Built by the credential-verification step, consumed by the issuer and
/// rebuilt by the verifier. Fields are private so every instance has passed
/// validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    principal: String,
    roles: Vec<String>,
}

impl Identity {
    pub fn new<I, S>(principal: impl Into<String>, roles: I) -> Result<Self, EncodingError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let principal = principal.into();
        validate_principal(&principal)?;

        let mut out: Vec<String> = Vec::new();
        for role in roles {
            let role = role.into();
            validate_role(&role)?;
            if out.contains(&role) {
                return Err(EncodingError::DuplicateRole(role));
            }
            out.push(role);
        }

        Ok(Self {
            principal,
            roles: out,
        })
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn into_parts(self) -> (String, Vec<String>) {
        (self.principal, self.roles)
    }
}

fn validate_principal(principal: &str) -> Result<(), EncodingError> {
    if principal.trim().is_empty() {
        return Err(EncodingError::EmptyPrincipal);
    }
    if principal.chars().any(char::is_control) {
        return Err(EncodingError::InvalidPrincipal);
    }
    Ok(())
}

/// Roles are short `[A-Za-z0-9_]` tokens, so they can never carry the
/// delimiters of the legacy subject format.
pub fn validate_role(role: &str) -> Result<(), EncodingError> {
    let ok = !role.is_empty()
        && role.len() <= MAX_ROLE_LEN
        && role
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_');

    if ok {
        Ok(())
    } else {
        Err(EncodingError::InvalidRole(role.to_string()))
    }
}
