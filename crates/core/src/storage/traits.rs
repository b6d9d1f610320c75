//! Storage repository traits
//!
//! The session layer talks to storage through this interface, so a
//! different backend (or a mock) can stand in for SQLite.

use crate::error::Result;
use crate::models::User;

/// User repository operations
pub trait UserRepository {
    /// Insert a user and return the assigned id
    fn insert_user(&self, username: &str, password_hash: &str) -> Result<i64>;

    /// Overwrite username and password hash for `id`
    fn update_user(&self, id: i64, username: &str, password_hash: &str) -> Result<()>;

    /// Delete exactly one user
    fn delete_user(&self, id: i64) -> Result<()>;

    /// Delete all users
    fn delete_all_users(&self) -> Result<u64>;

    /// List every stored username
    fn get_all_usernames(&self) -> Result<Vec<String>>;

    /// Find users with exactly this username
    fn get_user_by_username(&self, username: &str) -> Result<Vec<User>>;
}
