pub mod claims;
pub mod clock;
pub mod factory;
pub mod identity;
pub mod jwt;
pub mod token_issuer;
pub mod token_verifier;

pub use factory::build_token_services;
pub use identity::{EncodingError, Identity};
pub use token_issuer::{IssuedToken, TokenIssuer};
pub use token_verifier::{AuthorizationContext, TokenError, TokenVerifier};
