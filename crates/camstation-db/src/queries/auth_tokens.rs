//! Login token queries.

use camstation_common::{Error, Result, TokenId, UserId};
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::models::{AuthToken, User};
use crate::queries::users;

/// Store a new token for `user_id` valid until `expires_at`.
pub fn create_token(
    conn: &Connection,
    user_id: UserId,
    token: &str,
    expires_at: DateTime<Utc>,
) -> Result<AuthToken> {
    let id = TokenId::new();
    let created_at = Utc::now();

    conn.execute(
        "INSERT INTO auth_tokens (id, user_id, token, expires_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            id.to_string(),
            user_id.to_string(),
            token,
            expires_at.to_rfc3339(),
            created_at.to_rfc3339()
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(AuthToken {
        id,
        user_id,
        token: token.to_string(),
        expires_at,
        created_at,
    })
}

/// Look up a token by its value, expired or not.
pub fn get_token(conn: &Connection, token: &str) -> Result<Option<AuthToken>> {
    let q = format!("SELECT {} FROM auth_tokens WHERE token = ?1", AuthToken::COLS);
    match conn.query_row(&q, [token], AuthToken::from_row) {
        Ok(t) => Ok(Some(t)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Resolve a token to its owner if the token exists and has not expired.
pub fn get_valid_token_user(
    conn: &Connection,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<(AuthToken, User)>> {
    let Some(tok) = get_token(conn, token)? else {
        return Ok(None);
    };
    if tok.is_expired(now) {
        return Ok(None);
    }
    Ok(users::get_user(conn, tok.user_id)?.map(|user| (tok, user)))
}

/// Delete a token by value. Returns `true` if a row was removed.
pub fn delete_token(conn: &Connection, token: &str) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM auth_tokens WHERE token = ?1", [token])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Delete every token that expired before `now`.
pub fn delete_expired_tokens(conn: &Connection, now: DateTime<Utc>) -> Result<usize> {
    conn.execute(
        "DELETE FROM auth_tokens WHERE expires_at <= ?1",
        [now.to_rfc3339()],
    )
    .map_err(|e| Error::database(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use camstation_common::Role;
    use chrono::Duration;

    #[test]
    fn test_create_get_delete() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, "tok_user", "hash", Role::User).unwrap();

        let expires = Utc::now() + Duration::hours(1);
        let tok = create_token(&conn, user.id, "abc123", expires).unwrap();
        assert_eq!(tok.token, "abc123");

        let found = get_token(&conn, "abc123").unwrap().unwrap();
        assert_eq!(found.user_id, user.id);

        assert!(delete_token(&conn, "abc123").unwrap());
        assert!(get_token(&conn, "abc123").unwrap().is_none());
        assert!(!delete_token(&conn, "abc123").unwrap());
    }

    #[test]
    fn test_expired_token_is_not_valid() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, "u", "hash", Role::User).unwrap();

        let now = Utc::now();
        create_token(&conn, user.id, "old", now - Duration::minutes(5)).unwrap();
        create_token(&conn, user.id, "fresh", now + Duration::hours(2)).unwrap();

        assert!(get_valid_token_user(&conn, "old", now).unwrap().is_none());
        let (_, owner) = get_valid_token_user(&conn, "fresh", now).unwrap().unwrap();
        assert_eq!(owner.username, "u");

        assert_eq!(delete_expired_tokens(&conn, now).unwrap(), 1);
        assert!(get_token(&conn, "old").unwrap().is_none());
        assert!(get_token(&conn, "fresh").unwrap().is_some());
    }
}
