pub mod auth;
pub mod errors;
pub mod posts;
pub mod tokens;
pub mod users;
