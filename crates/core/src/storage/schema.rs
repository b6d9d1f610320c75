//! Database schema definitions

use rusqlite::Connection;
use crate::error::Result;

pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Users table; `password` holds the PHC hash string, never plaintext
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password TEXT
        );
        "#,
    )?;

    Ok(())
}

pub fn drop_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch("DROP TABLE IF EXISTS users;")?;
    Ok(())
}
