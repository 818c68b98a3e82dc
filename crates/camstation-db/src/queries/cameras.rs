//! Camera registry queries.

use camstation_common::{CameraId, Error, Result};
use chrono::Utc;
use rusqlite::Connection;

use crate::models::Camera;

/// Register a camera.
pub fn create_camera(
    conn: &Connection,
    name: &str,
    source: &str,
    location: &str,
) -> Result<Camera> {
    let id = CameraId::new();
    let created_at = Utc::now();

    conn.execute(
        "INSERT INTO cameras (id, name, source, location, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![id.to_string(), name, source, location, created_at.to_rfc3339()],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Camera {
        id,
        name: name.to_string(),
        source: source.to_string(),
        location: location.to_string(),
        created_at,
    })
}

/// Get a camera by ID.
pub fn get_camera(conn: &Connection, id: CameraId) -> Result<Option<Camera>> {
    let q = format!("SELECT {} FROM cameras WHERE id = ?1", Camera::COLS);
    match conn.query_row(&q, [id.to_string()], Camera::from_row) {
        Ok(c) => Ok(Some(c)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List cameras in registration order.
pub fn list_cameras(conn: &Connection) -> Result<Vec<Camera>> {
    let q = format!(
        "SELECT {} FROM cameras ORDER BY created_at, name",
        Camera::COLS
    );
    let mut stmt = conn
        .prepare(&q)
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], Camera::from_row)
        .map_err(|e| Error::database(e.to_string()))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))
}

/// Delete a camera. Its recording rows go with it (`ON DELETE CASCADE`).
pub fn delete_camera(conn: &Connection, id: CameraId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM cameras WHERE id = ?1", [id.to_string()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}
