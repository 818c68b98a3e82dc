//! Camstation-DB: database schema, migrations, and query operations.
//!
//! SQLite through rusqlite with r2d2 connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Embedded schema migrations
//! - `pool` - Connection pool management
//! - `models` - Rust models matching the schema
//! - `queries` - Query operations grouped by table
//!
//! # Example
//!
//! ```
//! use camstation_common::Role;
//! use camstation_db::pool::{get_conn, init_memory_pool};
//! use camstation_db::queries::{cameras, users};
//!
//! let pool = init_memory_pool().unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! users::create_user(&conn, "admin", "hash", Role::Admin).unwrap();
//! let camera = cameras::create_camera(&conn, "Front door", "webcam", "Hallway").unwrap();
//! assert_eq!(camera.source, "webcam");
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
