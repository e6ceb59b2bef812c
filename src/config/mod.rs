use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::net::SocketAddr;
use std::str::FromStr;

/// Development-only token key: "insecure-dev-key-change-me-now!!" (32 bytes).
/// Any real deployment must set `TOKEN_SECRET_KEY`.
pub const INSECURE_DEFAULT_TOKEN_KEY: &str = "aW5zZWN1cmUtZGV2LWtleS1jaGFuZ2UtbWUtbm93ISE=";

/// Upper bound for `ACCESS_TTL_SECONDS` (one year).
pub const MAX_ACCESS_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub db_max_lifetime_seconds: u64,
    pub token_key: [u8; 32],
    pub token_key_is_default: bool,
    pub access_ttl_seconds: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        let token_key_is_default = std::env::var("TOKEN_SECRET_KEY").is_err();

        Ok(Self {
            http_addr,
            database_url: env_or_err("DATABASE_URL")?,
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "10")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env_or_parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            db_max_lifetime_seconds: env_or_parse("DB_MAX_LIFETIME_SECONDS", "1800")?,
            token_key: env_key_32_or("TOKEN_SECRET_KEY", INSECURE_DEFAULT_TOKEN_KEY)?,
            token_key_is_default,
            access_ttl_seconds: parse_access_ttl(&env_or("ACCESS_TTL_SECONDS", "120"))?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

fn parse_access_ttl(value: &str) -> Result<i64> {
    let seconds = value
        .parse::<i64>()
        .map_err(|err| anyhow!("invalid ACCESS_TTL_SECONDS: {}", err))?;
    if !(1..=MAX_ACCESS_TTL_SECONDS).contains(&seconds) {
        return Err(anyhow!(
            "invalid ACCESS_TTL_SECONDS: must be between 1 and {}",
            MAX_ACCESS_TTL_SECONDS
        ));
    }
    Ok(seconds)
}

fn env_key_32_or(key: &str, default: &str) -> Result<[u8; 32]> {
    let value = env_or(key, default);
    decode_key_32(&value).map_err(|err| anyhow!("invalid {}: {}", key, err))
}

pub fn decode_key_32(value: &str) -> Result<[u8; 32]> {
    let decoded = STANDARD.decode(value.as_bytes())?;
    if decoded.len() != 32 {
        return Err(anyhow!("expected 32 bytes, got {}", decoded.len()));
    }
    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&decoded);
    Ok(key_bytes)
}
