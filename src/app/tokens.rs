//! Stateless bearer tokens: PASETO v4.local carrying `sub` and `exp`.
//!
//! Nothing is persisted; expiry is the only way a token stops being valid.

use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("paseto error")]
    Paseto(#[from] pasetors::errors::Error),

    #[error("invalid expiry timestamp")]
    Timestamp(#[from] time::error::Format),

    #[error("token expiry out of range")]
    ExpiryOutOfRange,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct TokenIssuer {
    key: [u8; 32],
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(key: [u8; 32], lifetime: Duration) -> Self {
        Self { key, lifetime }
    }

    pub fn issue(&self, username: &str) -> Result<IssuedToken, TokenError> {
        let expires_at = OffsetDateTime::now_utc()
            .checked_add(self.lifetime)
            .ok_or(TokenError::ExpiryOutOfRange)?;
        self.issue_until(username, expires_at)
    }

    /// Issues a token with an explicit expiry, which may already be in the past.
    pub fn issue_until(
        &self,
        username: &str,
        expires_at: OffsetDateTime,
    ) -> Result<IssuedToken, TokenError> {
        let mut claims = Claims::new()?;
        claims.subject(username)?;
        claims.expiration(&expires_at.format(&Rfc3339)?)?;
        let token = self.seal(&claims)?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Seals an arbitrary claim set under this issuer's key.
    pub fn seal(&self, claims: &Claims) -> Result<String, TokenError> {
        let key = SymmetricKey::<V4>::from(&self.key)?;
        Ok(local::encrypt(&key, claims, None, None)?)
    }

    /// Returns the token's subject, or `None` when the token is malformed,
    /// sealed under another key, expired, or carries no `sub`.
    pub fn verify(&self, token: &str) -> Result<Option<String>, TokenError> {
        let key = SymmetricKey::<V4>::from(&self.key)?;
        let rules = ClaimsValidationRules::new();

        let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };

        let subject = trusted
            .payload_claims()
            .and_then(|claims| claims.get_claim("sub"))
            .and_then(|value| value.as_str())
            .map(str::to_string);
        Ok(subject)
    }
}
