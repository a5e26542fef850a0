use std::{fmt, sync::Arc};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::Validation;
use jsonwebtoken::errors::ErrorKind;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::services::auth::claims::{ClaimsFormat, TokenClaims};
use crate::services::auth::clock::Clock;
use crate::services::auth::jwt::SigningKeys;

/// Why a presented token was rejected.
///
/// Every kind is client-facing and recoverable by logging in again. Messages
/// never carry token contents or key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("no token presented")]
    EmptyToken,

    #[error("token has expired")]
    ExpiredToken,

    #[error("token format or algorithm is not supported")]
    UnsupportedFormat,

    #[error("token is not correctly constructed")]
    MalformedToken,

    #[error("token signature is invalid")]
    SignatureInvalid,

    #[error("token claims do not describe a valid identity")]
    MalformedClaims,
}

impl TokenError {
    /// Stable machine-readable code (HTTP bodies, log fields).
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::EmptyToken => "EMPTY_TOKEN",
            TokenError::ExpiredToken => "EXPIRED_TOKEN",
            TokenError::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            TokenError::MalformedToken => "MALFORMED_TOKEN",
            TokenError::SignatureInvalid => "SIGNATURE_INVALID",
            TokenError::MalformedClaims => "MALFORMED_CLAIMS",
        }
    }
}

/// Identity reconstructed from a verified token; lives for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationContext {
    pub principal: String,
    pub roles: Vec<String>,
    /// `jti`, for log correlation only.
    pub token_id: Option<String>,
    /// Unix seconds.
    pub expires_at: i64,
}

impl AuthorizationContext {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// Checks signature and expiry of bearer tokens and rebuilds the identity
/// they carry.
///
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct TokenVerifier {
    keys: SigningKeys,
    validation: Validation,
    format: ClaimsFormat,
    leeway_seconds: u64,
    issuer: Option<String>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("keys", &self.keys)
            .field("format", &self.format)
            .field("leeway_seconds", &self.leeway_seconds)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl TokenVerifier {
    pub fn new(
        keys: SigningKeys,
        format: ClaimsFormat,
        leeway_seconds: u64,
        issuer: Option<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut validation = Validation::new(keys.algorithm());
        // `exp` is compared against the injected clock below.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            keys,
            validation,
            format,
            leeway_seconds,
            issuer,
            clock,
        }
    }

    /// Verify a raw token (the header value with the `Bearer ` prefix
    /// already stripped).
    ///
    /// `None`, `""` and whitespace are all reported as [`TokenError::EmptyToken`].
    /// Each rejection emits one `warn` record naming the failure kind.
    pub fn verify<'a>(
        &self,
        raw_token: impl Into<Option<&'a str>>,
    ) -> Result<AuthorizationContext, TokenError> {
        match self.verify_token(raw_token.into()) {
            Ok(ctx) => {
                debug!(principal = %ctx.principal, jti = ?ctx.token_id, "token verified");
                Ok(ctx)
            }
            Err(err) => {
                warn!(reason = err.code(), "token rejected: {err}");
                Err(err)
            }
        }
    }

    fn verify_token(&self, raw_token: Option<&str>) -> Result<AuthorizationContext, TokenError> {
        let token = raw_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(TokenError::EmptyToken)?;

        let signature = self.parse_structure(token)?;

        // A signature segment that is not canonical base64url can never match.
        if URL_SAFE_NO_PAD.decode(signature).is_err() {
            return Err(TokenError::SignatureInvalid);
        }

        let claims =
            jsonwebtoken::decode::<TokenClaims>(token, self.keys.decoding_key(), &self.validation)
                .map_err(|e| classify(e.kind()))?
                .claims;

        let now = self.clock.now();
        let leeway = i64::try_from(self.leeway_seconds).unwrap_or(i64::MAX);
        if now > claims.exp.saturating_add(leeway) {
            return Err(TokenError::ExpiredToken);
        }

        if let Some(expected) = self.issuer.as_deref() {
            if claims.iss.as_deref() != Some(expected) {
                return Err(TokenError::MalformedClaims);
            }
        }

        let identity = self
            .format
            .decode(&claims.sub, claims.roles)
            .ok_or(TokenError::MalformedClaims)?;
        let (principal, roles) = identity.into_parts();

        Ok(AuthorizationContext {
            principal,
            roles,
            token_id: claims.jti,
            expires_at: claims.exp,
        })
    }

    /// Split `header.payload.signature`, check the header names our algorithm,
    /// and hand back the signature segment.
    fn parse_structure<'t>(&self, token: &'t str) -> Result<&'t str, TokenError> {
        let segments: Vec<&str> = token.split('.').collect();
        let (header, payload, signature) = match segments.as_slice() {
            [h, p, s] => (*h, *p, *s),
            // Five segments is an encrypted (JWE) token.
            [_, _, _, _, _] => return Err(TokenError::UnsupportedFormat),
            _ => return Err(TokenError::MalformedToken),
        };

        if header.is_empty() || payload.is_empty() {
            return Err(TokenError::MalformedToken);
        }
        // Unsecured JWT.
        if signature.is_empty() {
            return Err(TokenError::UnsupportedFormat);
        }

        let header_json = URL_SAFE_NO_PAD
            .decode(header)
            .map_err(|_| TokenError::MalformedToken)?;
        let raw: RawHeader =
            serde_json::from_slice(&header_json).map_err(|_| TokenError::MalformedToken)?;

        if raw.alg != self.keys.algorithm_name() {
            return Err(TokenError::UnsupportedFormat);
        }

        jsonwebtoken::decode_header(token).map_err(|_| TokenError::MalformedToken)?;

        Ok(signature)
    }
}

fn classify(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
        ErrorKind::ExpiredSignature => TokenError::ExpiredToken,
        ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::MissingAlgorithm => TokenError::UnsupportedFormat,
        ErrorKind::InvalidToken => TokenError::MalformedToken,
        // Header and signature were checked already, so decode failures from
        // here on concern the payload.
        ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_)
        | ErrorKind::MissingRequiredClaim(_) => TokenError::MalformedClaims,
        _ => TokenError::MalformedToken,
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::Algorithm;
    use serde::Serialize;

    use super::*;
    use crate::services::auth::clock::testing::FixedClock;
    use crate::services::auth::jwt::SecretKey;
    use crate::services::auth::token_issuer::TokenIssuer;

    const SECRET: &str = "unit-test-secret-unit-test-secret-0123456789";
    const ISSUED_AT: i64 = 1_700_000_000;
    const TTL: u64 = 1440;

    struct Fixture {
        clock: Arc<FixedClock>,
        issuer: TokenIssuer,
        verifier: TokenVerifier,
        keys: SigningKeys,
    }

    fn keys(alg: Algorithm, secret: &str) -> SigningKeys {
        SigningKeys::new(alg, &SecretKey::new(secret).unwrap()).unwrap()
    }

    fn fixture(format: ClaimsFormat) -> Fixture {
        fixture_with(format, 0, None)
    }

    fn fixture_with(format: ClaimsFormat, leeway: u64, iss: Option<&str>) -> Fixture {
        let clock = Arc::new(FixedClock::new(ISSUED_AT));
        let keys = keys(Algorithm::HS512, SECRET);
        let iss = iss.map(str::to_string);
        Fixture {
            issuer: TokenIssuer::new(keys.clone(), format, TTL, iss.clone(), clock.clone()),
            verifier: TokenVerifier::new(keys.clone(), format, leeway, iss, clock.clone()),
            clock,
            keys,
        }
    }

    fn replace_char(token: &str, index: usize) -> String {
        let mut bytes = token.as_bytes().to_vec();
        bytes[index] = if bytes[index] == b'A' { b'B' } else { b'A' };
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn round_trip_structured() {
        let f = fixture(ClaimsFormat::Structured);
        let token = f.issuer.issue_for("alice", ["ADMIN", "USER"]).unwrap();

        let ctx = f.verifier.verify(token.token.as_str()).unwrap();
        assert_eq!(ctx.principal, "alice");
        assert_eq!(ctx.roles, ["ADMIN", "USER"]);
        assert_eq!(ctx.expires_at, ISSUED_AT + TTL as i64);
        assert!(ctx.token_id.is_some());
        assert!(ctx.has_role("ADMIN") && ctx.has_role("USER"));
    }

    #[test]
    fn round_trip_delimited() {
        let f = fixture(ClaimsFormat::Delimited);
        for roles in [vec![], vec!["USER"], vec!["ROLE_ADMIN", "ROLE_USER", "AUDIT"]] {
            let token = f.issuer.issue_for("bob", roles.clone()).unwrap();
            let ctx = f.verifier.verify(token.token.as_str()).unwrap();
            assert_eq!(ctx.principal, "bob");
            assert_eq!(ctx.roles, roles);
        }
    }

    #[test]
    fn principal_with_delimiters_round_trips_when_structured() {
        let f = fixture(ClaimsFormat::Structured);
        let token = f.issuer.issue_for("mary-jane,jr", ["USER"]).unwrap();
        let ctx = f.verifier.verify(token.token.as_str()).unwrap();
        assert_eq!(ctx.principal, "mary-jane,jr");
    }

    #[test]
    fn role_set_fidelity() {
        let f = fixture(ClaimsFormat::Structured);
        let token = f.issuer.issue_for("alice", ["ADMIN", "USER"]).unwrap();
        let ctx = f.verifier.verify(token.token.as_str()).unwrap();

        let mut roles = ctx.roles.clone();
        roles.sort();
        roles.dedup();
        assert_eq!(roles.len(), ctx.roles.len());
        assert_eq!(roles, ["ADMIN", "USER"]);
    }

    #[test]
    fn expiry_boundary() {
        let f = fixture(ClaimsFormat::Structured);
        let token = f.issuer.issue_for("alice", ["USER"]).unwrap().token;
        let exp = ISSUED_AT + TTL as i64;

        f.clock.set(exp - 1);
        assert!(f.verifier.verify(token.as_str()).is_ok());

        f.clock.set(exp);
        assert!(f.verifier.verify(token.as_str()).is_ok());

        f.clock.set(exp + 1);
        assert_eq!(
            f.verifier.verify(token.as_str()),
            Err(TokenError::ExpiredToken)
        );
    }

    #[test]
    fn leeway_extends_expiry() {
        let f = fixture_with(ClaimsFormat::Structured, 30, None);
        let token = f.issuer.issue_for("alice", ["USER"]).unwrap().token;
        let exp = ISSUED_AT + TTL as i64;

        f.clock.set(exp + 30);
        assert!(f.verifier.verify(token.as_str()).is_ok());
        f.clock.set(exp + 31);
        assert_eq!(
            f.verifier.verify(token.as_str()),
            Err(TokenError::ExpiredToken)
        );
    }

    #[test]
    fn tampering_payload_or_signature_is_detected() {
        let f = fixture(ClaimsFormat::Structured);
        let token = f.issuer.issue_for("alice", ["ADMIN", "USER"]).unwrap().token;

        let first_dot = token.find('.').unwrap();
        let second_dot = token.rfind('.').unwrap();

        for index in (first_dot + 1..token.len()).filter(|i| *i != second_dot) {
            let tampered = replace_char(&token, index);
            assert_eq!(
                f.verifier.verify(tampered.as_str()),
                Err(TokenError::SignatureInvalid),
                "byte {index} was changed"
            );
        }
    }

    #[test]
    fn dot_injected_into_payload_or_signature_is_malformed() {
        let f = fixture(ClaimsFormat::Structured);
        let token = f.issuer.issue_for("alice", ["ADMIN", "USER"]).unwrap().token;

        let first_dot = token.find('.').unwrap();
        let second_dot = token.rfind('.').unwrap();

        // An extra `.` changes the segment count before any signature work.
        for index in (first_dot + 1..token.len()).filter(|i| *i != second_dot) {
            let mut bytes = token.clone().into_bytes();
            bytes[index] = b'.';
            let tampered = String::from_utf8(bytes).unwrap();
            assert_eq!(
                f.verifier.verify(tampered.as_str()),
                Err(TokenError::MalformedToken),
                "byte {index} was changed"
            );
        }
    }

    #[test]
    fn wrong_secret_is_a_signature_failure() {
        let f = fixture(ClaimsFormat::Structured);
        let other = TokenIssuer::new(
            keys(Algorithm::HS512, "another-secret-another-secret-another-secret"),
            ClaimsFormat::Structured,
            TTL,
            None,
            f.clock.clone(),
        );
        let token = other.issue_for("alice", ["ADMIN"]).unwrap().token;
        assert_eq!(
            f.verifier.verify(token.as_str()),
            Err(TokenError::SignatureInvalid)
        );
    }

    #[test]
    fn empty_tokens() {
        let f = fixture(ClaimsFormat::Structured);
        assert_eq!(f.verifier.verify(""), Err(TokenError::EmptyToken));
        assert_eq!(f.verifier.verify(None), Err(TokenError::EmptyToken));
        assert_eq!(f.verifier.verify("   "), Err(TokenError::EmptyToken));
    }

    #[test]
    fn structural_garbage_is_malformed() {
        let f = fixture(ClaimsFormat::Structured);
        for raw in ["abc", "a.b", "a.b.c.d", "..sig", "!!!.e30.c2ln", "e30.e30.c2ln"] {
            assert_eq!(
                f.verifier.verify(raw),
                Err(TokenError::MalformedToken),
                "token {raw:?}"
            );
        }
    }

    #[test]
    fn unsupported_shapes_and_algorithms() {
        let f = fixture(ClaimsFormat::Structured);

        // JWE compact serialization.
        assert_eq!(
            f.verifier.verify("a.b.c.d.e"),
            Err(TokenError::UnsupportedFormat)
        );

        // Unsecured JWT: {"alg":"none"}.{"sub":"alice"}.
        let none = format!(
            "{}.{}.",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#),
            URL_SAFE_NO_PAD.encode(r#"{"sub":"alice","exp":9999999999}"#)
        );
        assert_eq!(
            f.verifier.verify(none.as_str()),
            Err(TokenError::UnsupportedFormat)
        );

        // `alg: none` with a dummy signature.
        let none_signed = format!("{none}c2ln");
        assert_eq!(
            f.verifier.verify(none_signed.as_str()),
            Err(TokenError::UnsupportedFormat)
        );

        // Valid HS256 token presented to an HS512 verifier.
        let hs256 = TokenIssuer::new(
            keys(Algorithm::HS256, SECRET),
            ClaimsFormat::Structured,
            TTL,
            None,
            f.clock.clone(),
        );
        let token = hs256.issue_for("alice", ["USER"]).unwrap().token;
        assert_eq!(
            f.verifier.verify(token.as_str()),
            Err(TokenError::UnsupportedFormat)
        );
    }

    #[derive(Serialize)]
    struct CustomClaims<'a> {
        sub: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        exp: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        roles: Option<serde_json::Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        iss: Option<&'a str>,
    }

    fn sign_custom(f: &Fixture, claims: &CustomClaims<'_>) -> String {
        f.keys.sign(claims).unwrap()
    }

    #[test]
    fn undecodable_claims_are_malformed_claims() {
        let f = fixture(ClaimsFormat::Structured);
        let exp = Some(ISSUED_AT + 60);

        let cases = [
            // Missing roles claim.
            CustomClaims { sub: "alice", exp, roles: None, iss: None },
            // Roles of the wrong type.
            CustomClaims { sub: "alice", exp, roles: Some(serde_json::json!("ADMIN")), iss: None },
            // Role with a forbidden character.
            CustomClaims { sub: "alice", exp, roles: Some(serde_json::json!(["AD MIN"])), iss: None },
            // Duplicate roles.
            CustomClaims { sub: "alice", exp, roles: Some(serde_json::json!(["A", "A"])), iss: None },
            // Empty principal.
            CustomClaims { sub: "", exp, roles: Some(serde_json::json!([])), iss: None },
            // Missing exp.
            CustomClaims { sub: "alice", exp: None, roles: Some(serde_json::json!([])), iss: None },
        ];

        for claims in &cases {
            let token = sign_custom(&f, claims);
            assert_eq!(
                f.verifier.verify(token.as_str()),
                Err(TokenError::MalformedClaims)
            );
        }
    }

    #[test]
    fn legacy_subject_without_role_part_is_malformed_claims() {
        let f = fixture(ClaimsFormat::Delimited);
        let token = sign_custom(
            &f,
            &CustomClaims { sub: "alice", exp: Some(ISSUED_AT + 60), roles: None, iss: None },
        );
        assert_eq!(
            f.verifier.verify(token.as_str()),
            Err(TokenError::MalformedClaims)
        );
    }

    #[test]
    fn issuer_is_checked_when_configured() {
        let f = fixture_with(ClaimsFormat::Structured, 0, Some("token-auth"));
        let token = f.issuer.issue_for("alice", ["USER"]).unwrap().token;
        assert!(f.verifier.verify(token.as_str()).is_ok());

        let foreign = sign_custom(
            &f,
            &CustomClaims {
                sub: "alice",
                exp: Some(ISSUED_AT + 60),
                roles: Some(serde_json::json!([])),
                iss: Some("someone-else"),
            },
        );
        assert_eq!(
            f.verifier.verify(foreign.as_str()),
            Err(TokenError::MalformedClaims)
        );
    }

    #[test]
    fn expiry_is_checked_before_claims() {
        let f = fixture(ClaimsFormat::Structured);
        let token = sign_custom(
            &f,
            &CustomClaims { sub: "alice", exp: Some(ISSUED_AT - 1), roles: None, iss: None },
        );
        assert_eq!(
            f.verifier.verify(token.as_str()),
            Err(TokenError::ExpiredToken)
        );
    }

    #[test]
    fn negative_exp_is_malformed_claims() {
        let f = fixture(ClaimsFormat::Structured);
        let token = sign_custom(
            &f,
            &CustomClaims {
                sub: "alice",
                exp: Some(-5),
                roles: Some(serde_json::json!([])),
                iss: None,
            },
        );
        assert_eq!(
            f.verifier.verify(token.as_str()),
            Err(TokenError::MalformedClaims)
        );
    }

    #[test]
    fn codes_are_distinct() {
        let all = [
            TokenError::EmptyToken,
            TokenError::ExpiredToken,
            TokenError::UnsupportedFormat,
            TokenError::MalformedToken,
            TokenError::SignatureInvalid,
            TokenError::MalformedClaims,
        ];
        let mut codes: Vec<_> = all.iter().map(TokenError::code).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }
}
