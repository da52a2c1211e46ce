use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::repo_types::SafeUser;

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub status: bool,
}

impl From<SafeUser> for PublicUser {
    fn from(u: SafeUser) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            status: u.status,
        }
    }
}
