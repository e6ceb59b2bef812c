//! Business errors raised by the user registry and the post catalog.

use thiserror::Error;

use crate::app::tokens::TokenError;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("user already exists")]
    UserExists,

    /// Bad credentials or a token that does not identify a live user. The
    /// cause is deliberately not distinguished.
    #[error("unauthorized")]
    Unauthorized,

    #[error("token processing error")]
    Token(#[from] TokenError),

    #[error("storage error")]
    Storage(#[from] sqlx::Error),

    #[error("password hashing task failed")]
    Hashing(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("post not found")]
    NotFound,

    #[error("You cannot like your own post")]
    AuthorLiked,

    #[error("You already liked this post")]
    AlreadyLiked,

    #[error("You did not like this post")]
    NotLiked,

    #[error("storage error")]
    Storage(#[from] sqlx::Error),
}
