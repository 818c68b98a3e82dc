//! Camstation-Common: shared types and errors.
//!
//! - **Typed IDs**: UUID wrappers for users, cameras, recordings and tokens
//! - **Roles**: the two account classes (`admin`, `user`)
//! - **Error Handling**: one error type with an HTTP status mapping
//!
//! # Examples
//!
//! ```
//! use camstation_common::{CameraId, Error, Result, Role};
//!
//! let camera_id = CameraId::new();
//! assert!(Role::Admin.is_admin());
//!
//! fn lookup(id: CameraId) -> Result<()> {
//!     Err(Error::not_found("camera", id))
//! }
//! assert_eq!(lookup(camera_id).unwrap_err().http_status(), 404);
//! ```

pub mod error;
pub mod ids;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
