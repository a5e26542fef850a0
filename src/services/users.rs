//! Credential check that runs before a token is issued.
//!
//! The directory is a collaborator of the token core: it only has to hand a
//! validated [`Identity`] to the issuer once the password is confirmed.

use std::{collections::HashMap, fmt, future::Future, pin::Pin};

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::services::auth::identity::Identity;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Verifies username + password and returns the identity to put in a token.
pub trait UserDirectory: Send + Sync {
    /// `None` when the user is unknown or the password does not match.
    fn authenticate<'a>(
        &'a self,
        username: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Option<Identity>>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UserSpecError {
    #[error("entry {0}: expected <name>:<sha256 hex>:<roles>")]
    Shape(usize),

    #[error("entry {0}: password digest is not 32 bytes of hex")]
    Digest(usize),

    #[error("entry {0}: invalid principal or roles")]
    Identity(usize),

    #[error("duplicate user: {0}")]
    Duplicate(String),
}

/// One configured account.
#[derive(Clone)]
pub struct UserRecord {
    identity: Identity,
    password_sha256: [u8; 32],
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("identity", &self.identity)
            .finish()
    }
}

impl UserRecord {
    pub fn new(identity: Identity, password: &str) -> Self {
        Self {
            identity,
            password_sha256: digest(password),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

/// Hex SHA-256 of `password`, the form `AUTH_USERS` expects.
pub fn password_digest_hex(password: &str) -> String {
    hex::encode(digest(password))
}

fn digest(password: &str) -> [u8; 32] {
    Sha256::digest(password.as_bytes()).into()
}

fn digests_match(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Parse `name:sha256hex:ROLE1,ROLE2;name2:sha256hex:` into records.
pub fn parse_users(spec: &str) -> Result<Vec<UserRecord>, UserSpecError> {
    let mut records: Vec<UserRecord> = Vec::new();

    let entries = spec
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty());

    for (index, entry) in entries.enumerate() {
        let mut fields = entry.splitn(3, ':');
        let (Some(name), Some(digest_hex), Some(roles)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(UserSpecError::Shape(index));
        };

        let password_sha256: [u8; 32] = hex::decode(digest_hex.trim())
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(UserSpecError::Digest(index))?;

        let roles: Vec<&str> = roles
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .collect();
        let identity =
            Identity::new(name.trim(), roles).map_err(|_| UserSpecError::Identity(index))?;

        if records
            .iter()
            .any(|r| r.identity.principal() == identity.principal())
        {
            return Err(UserSpecError::Duplicate(identity.principal().to_string()));
        }

        records.push(UserRecord {
            identity,
            password_sha256,
        });
    }

    Ok(records)
}

/// In-memory directory built from configuration.
#[derive(Clone, Default)]
pub struct StaticUserDirectory {
    users: HashMap<String, UserRecord>,
}

impl fmt::Debug for StaticUserDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticUserDirectory")
            .field("users", &self.users.len())
            .finish()
    }
}

impl StaticUserDirectory {
    pub fn new(records: impl IntoIterator<Item = UserRecord>) -> Self {
        let users = records
            .into_iter()
            .map(|r| (r.identity.principal().to_string(), r))
            .collect();
        Self { users }
    }

    fn check(&self, username: &str, password: &str) -> Option<Identity> {
        let presented = digest(password);
        let record = self.users.get(username)?;
        digests_match(&presented, &record.password_sha256).then(|| record.identity.clone())
    }
}

impl UserDirectory for StaticUserDirectory {
    fn authenticate<'a>(
        &'a self,
        username: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Option<Identity>> {
        Box::pin(async move { self.check(username, password) })
    }
}
