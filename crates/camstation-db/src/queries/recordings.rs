//! Saved recording queries.

use camstation_common::{CameraId, Error, RecordingId, Result};
use chrono::Utc;
use rusqlite::Connection;

use crate::models::Recording;

/// Record that `filename` was saved for `camera_id`.
pub fn create_recording(
    conn: &Connection,
    camera_id: CameraId,
    filename: &str,
) -> Result<Recording> {
    let id = RecordingId::new();
    let created_at = Utc::now();

    conn.execute(
        "INSERT INTO recordings (id, camera_id, filename, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            id.to_string(),
            camera_id.to_string(),
            filename,
            created_at.to_rfc3339()
        ],
    )
    .map_err(|e| {
        if e.to_string().contains("FOREIGN KEY constraint failed") {
            Error::not_found("camera", camera_id)
        } else {
            Error::database(e.to_string())
        }
    })?;

    Ok(Recording {
        id,
        camera_id,
        filename: Some(filename.to_string()),
        created_at,
    })
}

/// Get a recording by ID.
pub fn get_recording(conn: &Connection, id: RecordingId) -> Result<Option<Recording>> {
    let q = format!("SELECT {} FROM recordings WHERE id = ?1", Recording::COLS);
    match conn.query_row(&q, [id.to_string()], Recording::from_row) {
        Ok(r) => Ok(Some(r)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List recordings, newest first, optionally for one camera only.
pub fn list_recordings(conn: &Connection, camera_id: Option<CameraId>) -> Result<Vec<Recording>> {
    let (q, params): (String, Vec<String>) = match camera_id {
        Some(id) => (
            format!(
                "SELECT {} FROM recordings WHERE camera_id = ?1 ORDER BY created_at DESC",
                Recording::COLS
            ),
            vec![id.to_string()],
        ),
        None => (
            format!(
                "SELECT {} FROM recordings ORDER BY created_at DESC",
                Recording::COLS
            ),
            Vec::new(),
        ),
    };

    let mut stmt = conn
        .prepare(&q)
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), Recording::from_row)
        .map_err(|e| Error::database(e.to_string()))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))
}

/// Delete a recording row. Returns `true` if a row was removed.
pub fn delete_recording(conn: &Connection, id: RecordingId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM recordings WHERE id = ?1", [id.to_string()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Delete rows that never got a file name. Returns how many were removed.
pub fn delete_orphaned(conn: &Connection) -> Result<usize> {
    conn.execute(
        "DELETE FROM recordings WHERE filename IS NULL OR TRIM(filename) = ''",
        [],
    )
    .map_err(|e| Error::database(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use crate::queries::cameras;

    #[test]
    fn test_create_and_list_by_camera() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let a = cameras::create_camera(&conn, "A", "webcam", "").unwrap();
        let b = cameras::create_camera(&conn, "B", "webcam", "").unwrap();

        let rec = create_recording(&conn, a.id, "webcam_record_20240101_120000.mp4").unwrap();
        create_recording(&conn, b.id, "webcam_record_20240101_130000.mp4").unwrap();

        let fetched = get_recording(&conn, rec.id).unwrap().unwrap();
        assert_eq!(
            fetched.filename.as_deref(),
            Some("webcam_record_20240101_120000.mp4")
        );
        assert_eq!(fetched.camera_id, a.id);

        assert_eq!(list_recordings(&conn, None).unwrap().len(), 2);
        let only_a = list_recordings(&conn, Some(a.id)).unwrap();
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a[0].id, rec.id);
    }

    #[test]
    fn test_unknown_camera_is_not_found() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let err = create_recording(&conn, CameraId::new(), "x.mp4").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_delete_orphaned_keeps_named_rows() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let cam = cameras::create_camera(&conn, "A", "webcam", "").unwrap();

        let kept = create_recording(&conn, cam.id, "keep.mp4").unwrap();
        for filename in [None, Some("  ")] {
            conn.execute(
                "INSERT INTO recordings (id, camera_id, filename, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    RecordingId::new().to_string(),
                    cam.id.to_string(),
                    filename,
                    Utc::now().to_rfc3339()
                ],
            )
            .unwrap();
        }

        assert_eq!(delete_orphaned(&conn).unwrap(), 2);
        let remaining = list_recordings(&conn, None).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, kept.id);
    }

    #[test]
    fn test_camera_delete_cascades() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let cam = cameras::create_camera(&conn, "A", "webcam", "").unwrap();
        let rec = create_recording(&conn, cam.id, "a.mp4").unwrap();

        cameras::delete_camera(&conn, cam.id).unwrap();
        assert!(get_recording(&conn, rec.id).unwrap().is_none());
        assert!(!delete_recording(&conn, rec.id).unwrap());
    }
}
