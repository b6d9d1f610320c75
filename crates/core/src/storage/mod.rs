//! SQLite storage layer

mod schema;
mod traits;
mod users;

use crate::error::Result;
use crate::models::User;
use rusqlite::Connection;
use std::path::Path;
use tracing::instrument;

pub use traits::UserRepository;
pub use users::UserStore;

/// Main database handle
///
/// The connection is closed when the handle is dropped, so holding a
/// `Database` for the span of one operation releases it on every path.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.create_table()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.create_table()?;
        Ok(db)
    }

    /// Ensure the `users` table exists
    pub fn create_table(&self) -> Result<()> {
        schema::create_tables(&self.conn)
    }

    /// Drop the `users` table if present (test teardown)
    pub fn drop_table(&self) -> Result<()> {
        schema::drop_tables(&self.conn)
    }

    /// Get user store
    pub fn users(&self) -> UserStore<'_> {
        UserStore::new(&self.conn)
    }
}

impl UserRepository for Database {
    fn insert_user(&self, username: &str, password_hash: &str) -> Result<i64> {
        self.users().insert(username, password_hash)
    }

    fn update_user(&self, id: i64, username: &str, password_hash: &str) -> Result<()> {
        self.users().update(id, username, password_hash)
    }

    fn delete_user(&self, id: i64) -> Result<()> {
        self.users().delete(id)
    }

    fn delete_all_users(&self) -> Result<u64> {
        self.users().delete_all()
    }

    fn get_all_usernames(&self) -> Result<Vec<String>> {
        self.users().all_usernames()
    }

    fn get_user_by_username(&self, username: &str) -> Result<Vec<User>> {
        self.users().find_by_username(username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.create_table().unwrap();
        db.create_table().unwrap();

        db.insert_user("testUser", "hash").unwrap();
        assert_eq!(db.get_all_usernames().unwrap(), vec!["testUser".to_string()]);
    }

    #[test]
    fn test_drop_table_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.drop_table().unwrap();
        db.drop_table().unwrap();

        assert!(db.get_all_usernames().is_err());

        db.create_table().unwrap();
        assert!(db.get_all_usernames().unwrap().is_empty());
    }

    #[test]
    fn test_reopen_file_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.db");

        let id = {
            let db = Database::open(&path).unwrap();
            db.insert_user("testUser", "hash").unwrap()
        };

        let db = Database::open(&path).unwrap();
        let found = db.get_user_by_username("testUser").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
    }
}
