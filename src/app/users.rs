use async_trait::async_trait;
use sqlx::Row;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use time::OffsetDateTime;

use crate::app::errors::RegistryError;
use crate::domain::user::{Activities, Credentials};
use crate::infra::db::{is_unique_violation, Db};

/// Persistence for user rows: credentials plus the login/activity columns.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`RegistryError::UserExists`] when the username is taken.
    async fn insert_user(
        &self,
        username: &str,
        credentials: Credentials,
    ) -> Result<(), RegistryError>;

    async fn credentials(&self, username: &str) -> Result<Option<Credentials>, RegistryError>;

    async fn exists(&self, username: &str) -> Result<bool, RegistryError>;

    /// Sets both `last_login` and `last_activity` to `at` in a single write.
    async fn record_login(&self, username: &str, at: OffsetDateTime) -> Result<(), RegistryError>;

    async fn record_activity(
        &self,
        username: &str,
        at: OffsetDateTime,
    ) -> Result<(), RegistryError>;

    async fn activities(&self, username: &str) -> Result<Option<Activities>, RegistryError>;
}

pub type UserStorePtr = Arc<dyn UserStore>;

#[derive(Clone)]
pub struct PgUserStore {
    db: Db,
}

impl PgUserStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert_user(
        &self,
        username: &str,
        credentials: Credentials,
    ) -> Result<(), RegistryError> {
        let result = sqlx::query("INSERT INTO users (username, password, salt) VALUES ($1, $2, $3)")
            .bind(username)
            .bind(credentials.password_hash)
            .bind(credentials.salt)
            .execute(self.db.pool())
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(RegistryError::UserExists),
            Err(err) => Err(err.into()),
        }
    }

    async fn credentials(&self, username: &str) -> Result<Option<Credentials>, RegistryError> {
        let row = sqlx::query("SELECT password, salt FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|row| Credentials {
            password_hash: row.get("password"),
            salt: row.get("salt"),
        }))
    }

    async fn exists(&self, username: &str) -> Result<bool, RegistryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(self.db.pool())
                .await?;
        Ok(exists)
    }

    async fn record_login(&self, username: &str, at: OffsetDateTime) -> Result<(), RegistryError> {
        sqlx::query("UPDATE users SET last_login = $2, last_activity = $2 WHERE username = $1")
            .bind(username)
            .bind(at)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn record_activity(
        &self,
        username: &str,
        at: OffsetDateTime,
    ) -> Result<(), RegistryError> {
        sqlx::query("UPDATE users SET last_activity = $2 WHERE username = $1")
            .bind(username)
            .bind(at)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn activities(&self, username: &str) -> Result<Option<Activities>, RegistryError> {
        let row = sqlx::query("SELECT last_login, last_activity FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|row| Activities {
            last_login: row.get("last_login"),
            last_activity: row.get("last_activity"),
        }))
    }
}

#[derive(Debug, Clone)]
struct UserRecord {
    credentials: Credentials,
    activities: Activities,
}

/// In-process user store with the same contract as [`PgUserStore`].
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops a user row, as an operator deleting the account would.
    pub fn remove_user(&self, username: &str) -> bool {
        self.lock().remove(username).is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, UserRecord>> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert_user(
        &self,
        username: &str,
        credentials: Credentials,
    ) -> Result<(), RegistryError> {
        let mut users = self.lock();
        if users.contains_key(username) {
            return Err(RegistryError::UserExists);
        }
        users.insert(
            username.to_string(),
            UserRecord {
                credentials,
                activities: Activities::default(),
            },
        );
        Ok(())
    }

    async fn credentials(&self, username: &str) -> Result<Option<Credentials>, RegistryError> {
        Ok(self
            .lock()
            .get(username)
            .map(|record| record.credentials.clone()))
    }

    async fn exists(&self, username: &str) -> Result<bool, RegistryError> {
        Ok(self.lock().contains_key(username))
    }

    async fn record_login(&self, username: &str, at: OffsetDateTime) -> Result<(), RegistryError> {
        if let Some(record) = self.lock().get_mut(username) {
            record.activities.last_login = Some(at);
            record.activities.last_activity = Some(at);
        }
        Ok(())
    }

    async fn record_activity(
        &self,
        username: &str,
        at: OffsetDateTime,
    ) -> Result<(), RegistryError> {
        if let Some(record) = self.lock().get_mut(username) {
            record.activities.last_activity = Some(at);
        }
        Ok(())
    }

    async fn activities(&self, username: &str) -> Result<Option<Activities>, RegistryError> {
        Ok(self
            .lock()
            .get(username)
            .map(|record| record.activities.clone()))
    }
}
