//! Error types for the account manager

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Username already exists: {0}")]
    DuplicateUsername(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No user is logged in")]
    NotLoggedIn,

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<argon2::password_hash::Error> for Error {
    fn from(err: argon2::password_hash::Error) -> Self {
        Error::PasswordHash(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
