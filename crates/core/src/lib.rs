//! Accounts Core Library
//!
//! Local username/password accounts: SQLite storage, Argon2 credential
//! hashing, the login session state machine, and the interactive prompts.

pub mod auth;
pub mod config;
pub mod console;
pub mod error;
pub mod models;
pub mod storage;

pub use auth::{PasswordUpdate, Registration, Session, SessionState};
pub use config::{Config, Environment};
pub use console::{Console, Flow};
pub use error::{Error, Result};
pub use models::*;
pub use storage::{Database, UserRepository, UserStore};
