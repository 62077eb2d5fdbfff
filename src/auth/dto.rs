use serde::{Deserialize, Serialize};

use crate::auth::repo_types::{Role, User};
use crate::session::SessionData;

/// Login form body.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form body. `role` stays a string so an unknown value can be
/// reported back instead of rejected by the extractor.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub password: String,
    #[serde(default)]
    pub role: String,
}

/// Outcome of an auth operation as seen by the page layer.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PublicUser>,
}

impl AuthResponse {
    pub fn ok(message: impl Into<String>, user: Option<PublicUser>) -> Self {
        Self {
            success: true,
            message: message.into(),
            user,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            user: None,
        }
    }
}

/// Public part of the user, safe to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            full_name: u.full_name.clone(),
            email: u.email.clone(),
            role: u.role,
        }
    }
}

impl From<&SessionData> for PublicUser {
    fn from(s: &SessionData) -> Self {
        Self {
            id: s.user_id,
            full_name: s.user_name.clone(),
            email: s.user_email.clone(),
            role: s.user_role,
        }
    }
}
