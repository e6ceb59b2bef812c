use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use time::OffsetDateTime;

use crate::app::errors::RegistryError;
use crate::app::tokens::{IssuedToken, TokenIssuer};
use crate::app::users::UserStorePtr;
use crate::domain::user::{Activities, Credentials};

pub const SALT_LEN: usize = 32;
pub const HASH_ITERATIONS: u32 = 100_000;
pub const HASH_LEN: usize = 128;

/// Hashed against when the username is unknown, so a miss costs the same
/// as a wrong password.
const DUMMY_SALT: [u8; SALT_LEN] = [0u8; SALT_LEN];

/// Owns user credentials, token issuance and activity tracking.
#[derive(Clone)]
pub struct Registry {
    users: UserStorePtr,
    tokens: TokenIssuer,
}

impl Registry {
    pub fn new(users: UserStorePtr, tokens: TokenIssuer) -> Self {
        Self { users, tokens }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub async fn signup(&self, username: &str, password: &str) -> Result<(), RegistryError> {
        let salt = generate_salt();
        let password_hash = digest_blocking(password, salt.clone()).await?;
        self.users
            .insert_user(
                username,
                Credentials {
                    password_hash,
                    salt,
                },
            )
            .await?;
        tracing::info!(%username, "user signed up");
        Ok(())
    }

    /// An unknown username verifies as `false`, same as a wrong password.
    pub async fn verify(&self, username: &str, password: &str) -> Result<bool, RegistryError> {
        let Some(credentials) = self.users.credentials(username).await? else {
            digest_blocking(password, DUMMY_SALT.to_vec()).await?;
            return Ok(false);
        };

        let candidate = digest_blocking(password, credentials.salt).await?;
        Ok(candidate.ct_eq(&credentials.password_hash).into())
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, RegistryError> {
        if !self.verify(username, password).await? {
            return Err(RegistryError::Unauthorized);
        }

        // Nothing is persisted unless a token could be issued.
        let token = self.tokens.issue(username)?;
        self.users
            .record_login(username, OffsetDateTime::now_utc())
            .await?;
        Ok(token)
    }

    /// Resolves a bearer token to the username it was issued for.
    pub async fn authenticate(&self, token: &str) -> Result<String, RegistryError> {
        let username = self
            .tokens
            .verify(token)?
            .ok_or(RegistryError::Unauthorized)?;

        if !self.users.exists(&username).await? {
            return Err(RegistryError::Unauthorized);
        }

        Ok(username)
    }

    pub async fn track_activity(&self, username: &str) -> Result<(), RegistryError> {
        self.users
            .record_activity(username, OffsetDateTime::now_utc())
            .await
    }

    pub async fn get_activities(&self, username: &str) -> Result<Option<Activities>, RegistryError> {
        self.users.activities(username).await
    }
}

pub fn generate_salt() -> Vec<u8> {
    let mut salt = vec![0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

async fn digest_blocking(password: &str, salt: Vec<u8>) -> Result<Vec<u8>, RegistryError> {
    let password = password.to_string();
    let digest = tokio::task::spawn_blocking(move || hash_password(&password, &salt)).await?;
    Ok(digest)
}

/// PBKDF2-HMAC-SHA256 digest of `password` under `salt`.
pub fn hash_password(password: &str, salt: &[u8]) -> Vec<u8> {
    let mut digest = vec![0u8; HASH_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, HASH_ITERATIONS, &mut digest);
    digest
}
