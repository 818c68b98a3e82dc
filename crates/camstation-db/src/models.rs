//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for building itself from a
//! `rusqlite::Row` whose columns follow the model's `COLS` order.

use camstation_common::{CameraId, RecordingId, Role, TokenId, UserId};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// Parse a UUID-based ID from a text column.
fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    let uuid = Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e))?;
    Ok(T::from(uuid))
}

/// Parse an RFC 3339 timestamp from a text column.
fn parse_time(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn parse_role(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Role> {
    let s: String = row.get(idx)?;
    s.parse::<Role>().map_err(|e| {
        conversion_error(
            idx,
            std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        )
    })
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A login account.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub const COLS: &'static str = "id, username, password_hash, role, created_at";

    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
            role: parse_role(row, 3)?,
            created_at: parse_time(row, 4)?,
        })
    }
}

// ---------------------------------------------------------------------------
// AuthToken
// ---------------------------------------------------------------------------

/// An opaque session token issued at login.
#[derive(Debug, Clone)]
pub struct AuthToken {
    pub id: TokenId,
    pub user_id: UserId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl AuthToken {
    pub const COLS: &'static str = "id, user_id, token, expires_at, created_at";

    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            user_id: parse_id(row, 1)?,
            token: row.get(2)?,
            expires_at: parse_time(row, 3)?,
            created_at: parse_time(row, 4)?,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

/// A registered camera. `source` is `"webcam"` for the local capture device.
#[derive(Debug, Clone)]
pub struct Camera {
    pub id: CameraId,
    pub name: String,
    pub source: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
}

impl Camera {
    pub const COLS: &'static str = "id, name, source, location, created_at";

    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            name: row.get(1)?,
            source: row.get(2)?,
            location: row.get(3)?,
            created_at: parse_time(row, 4)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Recording
// ---------------------------------------------------------------------------

/// A saved recording: which camera, and the file name inside the
/// recordings directory.
#[derive(Debug, Clone)]
pub struct Recording {
    pub id: RecordingId,
    pub camera_id: CameraId,
    pub filename: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Recording {
    pub const COLS: &'static str = "id, camera_id, filename, created_at";

    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            camera_id: parse_id(row, 1)?,
            filename: row.get(2)?,
            created_at: parse_time(row, 3)?,
        })
    }
}
