use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 PHC string, never leaves the repo layer in JSON
    pub status: bool,          // false once deactivated
    pub created_at: OffsetDateTime,
}

/// User projection with the credential digest removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafeUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub status: bool,
}

impl From<User> for SafeUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            status: u.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct FavoriteRecipe {
    pub recipe_id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Review {
    pub recipe_id: String,
    pub title: String,
    pub rating: i16,
    pub comment: Option<String>,
}
