//! User entity definitions

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Messages authored by a deleted user are reassigned to this
/// reserved row, which the schema bootstrap always seeds.
pub const DELETED_USER_ID: i64 = 0;

/// Read-only snapshot of a user row.
///
/// The stored password is deliberately not part of the snapshot; it is
/// only ever compared inside `UserRepository::authenticate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub userid: i64,
    pub username: String,
    pub last_login_ts: i64,
    pub admin: bool,
    pub active: bool,
}

impl User {
    /// Last login as a datetime rather than a raw epoch value.
    pub fn last_login(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.last_login_ts, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

/// Request for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub admin: bool,
}

/// Request for updating an existing user; unset fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub last_login_ts: Option<i64>,
    pub admin: Option<bool>,
    pub active: Option<bool>,
}
