//! Account roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two classes of account the station knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Can manage cameras and recordings.
    Admin,
    /// Can view cameras, stream, and start/stop recording.
    User,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Landing page a client should redirect to after login.
    pub fn landing_path(self) -> &'static str {
        match self {
            Role::Admin => "/admin",
            Role::User => "/user",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}
