//! User model

use serde::{Deserialize, Serialize};

/// A locally stored user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// PHC-formatted hash; the salt is embedded
    pub password_hash: String,
}

impl User {
    pub fn new(id: i64, username: String, password_hash: String) -> Self {
        Self {
            id,
            username,
            password_hash,
        }
    }
}
