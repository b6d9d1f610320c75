//! Data models for the account manager

mod user;

pub use user::*;
