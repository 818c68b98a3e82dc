//! Database query modules.
//!
//! - users: account CRUD
//! - auth_tokens: login token management
//! - cameras: camera registry
//! - recordings: saved recording rows

pub mod auth_tokens;
pub mod cameras;
pub mod recordings;
pub mod users;
