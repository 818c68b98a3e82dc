//! User account queries.

use camstation_common::{Error, Result, Role, UserId};
use chrono::Utc;
use rusqlite::Connection;

use crate::models::User;

/// Create a new user.
///
/// Returns [`Error::Conflict`] if the username is already taken.
pub fn create_user(
    conn: &Connection,
    username: &str,
    password_hash: &str,
    role: Role,
) -> Result<User> {
    let id = UserId::new();
    let created_at = Utc::now();

    conn.execute(
        "INSERT INTO users (id, username, password_hash, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            id.to_string(),
            username,
            password_hash,
            role.as_str(),
            created_at.to_rfc3339()
        ],
    )
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            Error::Conflict(format!("Username '{username}' already exists"))
        } else {
            Error::database(e.to_string())
        }
    })?;

    Ok(User {
        id,
        username: username.to_string(),
        password_hash: password_hash.to_string(),
        role,
        created_at,
    })
}

/// Get a user by ID.
pub fn get_user(conn: &Connection, id: UserId) -> Result<Option<User>> {
    let q = format!("SELECT {} FROM users WHERE id = ?1", User::COLS);
    match conn.query_row(&q, [id.to_string()], User::from_row) {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Get a user by username.
pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    let q = format!("SELECT {} FROM users WHERE username = ?1", User::COLS);
    match conn.query_row(&q, [username], User::from_row) {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List all users ordered by username.
pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let q = format!("SELECT {} FROM users ORDER BY username", User::COLS);
    let mut stmt = conn
        .prepare(&q)
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], User::from_row)
        .map_err(|e| Error::database(e.to_string()))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))
}

/// Replace a user's password hash. Returns `false` if the user is missing.
pub fn update_password(conn: &Connection, id: UserId, password_hash: &str) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE users SET password_hash = ?1 WHERE id = ?2",
            rusqlite::params![password_hash, id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}
