/// User domain type
use super::UserId;
use serde::{Deserialize, Serialize};

/// User account
///
/// `current_token` is the only session token that is honoured for this user.
/// Every login overwrites it, which silently revokes the previous session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: UserId,

    /// Login email, unique across users
    pub email: String,

    /// Display name
    pub name: String,

    /// One-way password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// The single outstanding session token, if any
    #[serde(skip_serializing)]
    pub current_token: Option<String>,
}
