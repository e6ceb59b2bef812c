pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use std::sync::Arc;
use time::Duration;

use crate::app::auth::Registry;
use crate::app::posts::{CatalogPtr, PgCatalog};
use crate::app::tokens::TokenIssuer;
use crate::app::users::PgUserStore;
use crate::config::AppConfig;
use crate::infra::db::Db;

/// Shared request state. The database handle is only present for the
/// Postgres-backed wiring and is used for health checks.
#[derive(Clone)]
pub struct AppState {
    pub db: Option<Db>,
    pub registry: Registry,
    pub catalog: CatalogPtr,
}

impl AppState {
    pub fn new(registry: Registry, catalog: CatalogPtr) -> Self {
        Self {
            db: None,
            registry,
            catalog,
        }
    }

    pub fn postgres(db: Db, config: &AppConfig) -> Self {
        let tokens = TokenIssuer::new(
            config.token_key,
            Duration::seconds(config.access_ttl_seconds),
        );
        Self {
            registry: Registry::new(Arc::new(PgUserStore::new(db.clone())), tokens),
            catalog: Arc::new(PgCatalog::new(db.clone())),
            db: Some(db),
        }
    }
}
