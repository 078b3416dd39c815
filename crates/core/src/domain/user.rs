// User and Auth Session Domain Model
//
// Passwords are stored as entered. Credential hardening is out of scope.

use serde::{Deserialize, Serialize};

/// User ID (`user_{epoch_ms}_{token}`)
pub type UserId = String;

/// Storage key holding the JSON array of registered users
pub const USERS_KEY: &str = "grabgrub_users";

/// Storage key holding the current auth session
pub const AUTH_KEY: &str = "grabgrub_auth";

/// Registered user record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

/// Who is using the client right now
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user: Option<User>,
    #[serde(default)]
    pub is_logged_in: bool,
    #[serde(default)]
    pub is_guest: bool,
}

impl AuthSession {
    pub fn logged_in(user: User) -> Self {
        Self {
            user: Some(user),
            is_logged_in: true,
            is_guest: false,
        }
    }

    pub fn guest() -> Self {
        Self {
            user: None,
            is_logged_in: false,
            is_guest: true,
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    /// ID of the signed-in user; guests and signed-out sessions have none
    pub fn current_user_id(&self) -> Option<&str> {
        match (&self.user, self.is_logged_in) {
            (Some(user), true) => Some(user.id.as_str()),
            _ => None,
        }
    }

    /// A stored session is only honoured when its flags agree with its user
    pub fn normalized(self) -> Self {
        match self {
            AuthSession {
                user: Some(user),
                is_logged_in: true,
                ..
            } => AuthSession::logged_in(user),
            AuthSession { is_guest: true, .. } => AuthSession::guest(),
            _ => AuthSession::signed_out(),
        }
    }
}
