//! JWT Credential Issuance
//!
//! Binds a caller to an address with an opaque HS256 credential. The engine
//! issues a token when a player joins and verifies it on every guarded
//! operation; a caller-supplied address is never trusted for admin-gated
//! operations.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::game::Address;

/// Default credential lifetime in seconds (24 hours).
const DEFAULT_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

/// Authentication configuration.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// HS256 signing secret.
    pub secret: String,
    /// Credential lifetime in seconds.
    pub token_ttl_secs: u64,
    /// Whether to skip expiry validation (for testing only).
    pub skip_expiry: bool,
}

impl AuthConfig {
    /// Config with the given secret and default lifetime.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            skip_expiry: false,
        }
    }

    /// Create config from environment variables.
    ///
    /// Reads `KEYRACE_AUTH_SECRET` and optional `KEYRACE_TOKEN_TTL_SECS`.
    /// Returns `None` when no secret is configured.
    pub fn from_env() -> Option<Self> {
        let secret = std::env::var("KEYRACE_AUTH_SECRET").ok()?;
        let token_ttl_secs = std::env::var("KEYRACE_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        Some(Self {
            secret,
            token_ttl_secs,
            skip_expiry: false,
        })
    }
}

/// Claims carried by an issued credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// The authenticated address.
    pub address: String,
    /// Expiry timestamp (Unix seconds).
    #[serde(default)]
    pub exp: u64,
    /// Issued-at timestamp.
    #[serde(default)]
    pub iat: u64,
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token format is invalid.
    #[error("invalid token format")]
    InvalidFormat,
    /// Token signature verification failed.
    #[error("invalid signature")]
    InvalidSignature,
    /// Token has expired.
    #[error("token expired")]
    Expired,
    /// The address claim is missing or empty.
    #[error("missing address claim")]
    MissingAddress,
    /// JWT encoding/decoding error.
    #[error("token error: {0}")]
    TokenError(String),
}

/// Issues and verifies address-bound credentials.
pub struct TokenIssuer {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenIssuer {
    /// Build an issuer from config.
    pub fn new(config: AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Mint a credential binding the caller to `address`.
    pub fn issue(&self, address: &Address) -> Result<String, AuthError> {
        let now = unix_now();
        let claims = TokenClaims {
            address: address.as_str().to_owned(),
            exp: now + self.config.token_ttl_secs,
            iat: now,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenError(e.to_string()))
    }

    /// Verify a credential and return the address it binds.
    pub fn verify(&self, token: &str) -> Result<Address, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims = std::collections::HashSet::new();
        if self.config.skip_expiry {
            validation.validate_exp = false;
        }

        let data = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(map_jwt_error)?;

        if data.claims.address.is_empty() {
            return Err(AuthError::MissingAddress);
        }
        Ok(Address::new(data.claims.address))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Map JWT library errors to our error type.
fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidToken | ErrorKind::Base64(_) => AuthError::InvalidFormat,
        _ => AuthError::TokenError(err.to_string()),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(AuthConfig::new("test-secret-key-256-bits-long!!"))
    }

    #[test]
    fn test_issue_then_verify_round_trip() {
        let issuer = issuer();
        let address = Address::from("0xplayer1");

        let token = issuer.issue(&address).unwrap();
        let verified = issuer.verify(&token).unwrap();

        assert_eq!(verified, address);
    }

    #[test]
    fn test_garbage_token_rejected() {
        let issuer = issuer();
        let result = issuer.verify("not.a.jwt");
        assert!(matches!(
            result,
            Err(AuthError::InvalidFormat) | Err(AuthError::TokenError(_))
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer_a = issuer();
        let issuer_b = TokenIssuer::new(AuthConfig::new("a-different-secret-entirely!!!"));

        let token = issuer_a.issue(&Address::from("0xplayer1")).unwrap();
        let result = issuer_b.verify(&token);

        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    fn token_expired_in_1970(secret: &str) -> String {
        let claims = TokenClaims {
            address: "0xplayer1".into(),
            exp: 1,
            iat: 1,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = issuer();
        let token = token_expired_in_1970("test-secret-key-256-bits-long!!");

        let result = issuer.verify(&token);
        assert!(matches!(result, Err(AuthError::Expired)));
    }

    #[test]
    fn test_skip_expiry_for_testing() {
        let mut config = AuthConfig::new("test-secret-key-256-bits-long!!");
        config.skip_expiry = true;
        let issuer = TokenIssuer::new(config);

        let token = token_expired_in_1970("test-secret-key-256-bits-long!!");
        assert!(issuer.verify(&token).is_ok());
    }
}
