//! Credential issuer: signed, time-boxed bearer tokens bound to an
//! activated code's session.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::AuthSettings;
use crate::error::AppError;
use crate::models::SessionIdentity;

/// Claims embedded in a bearer token.
///
/// The token's `exp` is its own clock, independent of the underlying code's
/// `expires_at`; dependents must check both. Token validity never implies
/// session validity - the session may have been invalidated server-side
/// while the token is still cryptographically sound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user id).
    pub sub: String,
    /// Session identifier minted at activation.
    pub session_id: String,
    /// Issuer identity.
    pub iss: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(settings: &AuthSettings) -> Self {
        let secret = settings.token_secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: settings.issuer.clone(),
            ttl: Duration::hours(settings.token_ttl_hours),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a token for an activated session.
    pub fn issue(
        &self,
        user_id: i64,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let claims = AccessClaims {
            sub: user_id.to_string(),
            session_id: session_id.to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Verify signature, structure, issuer, and token-level expiry; extract
    /// the session identity. Callers must still run the session validator.
    pub fn verify(&self, token: &str) -> Result<SessionIdentity, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);

        let data = decode::<AccessClaims>(token, &self.decoding_key, &validation)?;
        let user_id = data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::TokenInvalid(jsonwebtoken::errors::ErrorKind::InvalidToken.into()))?;

        Ok(SessionIdentity {
            user_id,
            session_id: data.claims.session_id,
        })
    }
}
