//! User storage operations

use rusqlite::{ffi, params, Connection};
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::models::User;

pub struct UserStore<'a> {
    conn: &'a Connection,
}

impl<'a> UserStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a new user and return its assigned id
    #[instrument(skip(self, password_hash))]
    pub fn insert(&self, username: &str, password_hash: &str) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO users (username, password) VALUES (?1, ?2)",
                params![username, password_hash],
            )
            .map_err(|e| unique_violation(e, username))?;

        let id = self.conn.last_insert_rowid();
        debug!(id, "User inserted");
        Ok(id)
    }

    /// Overwrite username and password hash of an existing user
    #[instrument(skip(self, password_hash))]
    pub fn update(&self, id: i64, username: &str, password_hash: &str) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE users SET username = ?1, password = ?2 WHERE id = ?3",
                params![username, password_hash, id],
            )
            .map_err(|e| unique_violation(e, username))?;

        if changed == 0 {
            return Err(Error::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    /// Delete a user by id
    #[instrument(skip(self))]
    pub fn delete(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;

        if changed == 0 {
            return Err(Error::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    /// Delete every user, returning how many rows were removed
    pub fn delete_all(&self) -> Result<u64> {
        let count = self.conn.execute("DELETE FROM users", [])?;
        Ok(count as u64)
    }

    /// List all usernames
    pub fn all_usernames(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT username FROM users")?;
        let usernames = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(usernames)
    }

    /// Find users by exact, case-sensitive username
    #[instrument(skip(self))]
    pub fn find_by_username(&self, username: &str) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, username, password FROM users WHERE username = ?1")?;

        let users = stmt
            .query_map(params![username], |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    password_hash: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }
}

/// Map a UNIQUE constraint failure on `username` to a typed error
fn unique_violation(err: rusqlite::Error, username: &str) -> Error {
    match err {
        rusqlite::Error::SqliteFailure(ref e, _)
            if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Error::DuplicateUsername(username.to_string())
        }
        other => Error::Database(other),
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::storage::Database;

    #[test]
    fn test_insert_and_find() {
        let db = Database::open_in_memory().unwrap();
        let users = db.users();

        let id = users.insert("newTestUser", "hash").unwrap();
        let found = users.find_by_username("newTestUser").unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
        assert_eq!(found[0].password_hash, "hash");
    }

    #[test]
    fn test_ids_are_assigned_in_order() {
        let db = Database::open_in_memory().unwrap();
        let users = db.users();

        let first = users.insert("alice", "h1").unwrap();
        let second = users.insert("bob", "h2").unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_find_is_case_sensitive() {
        let db = Database::open_in_memory().unwrap();
        let users = db.users();
        users.insert("testUser", "hash").unwrap();

        assert!(users.find_by_username("testuser").unwrap().is_empty());
        assert!(users.find_by_username("TESTUSER").unwrap().is_empty());
        assert_eq!(users.find_by_username("testUser").unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let db = Database::open_in_memory().unwrap();
        let users = db.users();
        users.insert("testUser", "hash").unwrap();

        let err = users.insert("testUser", "other").unwrap_err();
        assert!(matches!(err, Error::DuplicateUsername(name) if name == "testUser"));
        assert_eq!(users.all_usernames().unwrap().len(), 1);
    }

    #[test]
    fn test_update_overwrites_both_columns() {
        let db = Database::open_in_memory().unwrap();
        let users = db.users();
        let id = users.insert("testUser", "old").unwrap();

        users.update(id, "renamed", "new").unwrap();

        assert!(users.find_by_username("testUser").unwrap().is_empty());
        let found = users.find_by_username("renamed").unwrap();
        assert_eq!(found[0].id, id);
        assert_eq!(found[0].password_hash, "new");
    }

    #[test]
    fn test_update_missing_user() {
        let db = Database::open_in_memory().unwrap();
        let err = db.users().update(42, "ghost", "hash").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_delete_user() {
        let db = Database::open_in_memory().unwrap();
        let users = db.users();
        let id = users.insert("testUser", "hash").unwrap();
        users.insert("other", "hash").unwrap();

        users.delete(id).unwrap();

        assert!(users.find_by_username("testUser").unwrap().is_empty());
        assert_eq!(users.all_usernames().unwrap(), vec!["other".to_string()]);
        assert!(matches!(users.delete(id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_delete_all_and_list() {
        let db = Database::open_in_memory().unwrap();
        let users = db.users();
        users.insert("a", "h").unwrap();
        users.insert("b", "h").unwrap();
        users.insert("c", "h").unwrap();

        let mut names = users.all_usernames().unwrap();
        names.sort();
        assert_eq!(names, vec!["a", "b", "c"]);

        assert_eq!(users.delete_all().unwrap(), 3);
        assert!(users.all_usernames().unwrap().is_empty());
    }
}
