use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_ROLE: &str = "user";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub username: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user row that has not been persisted yet; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub username: String,
    pub role: String,
    pub is_active: bool,
}

impl NewUser {
    pub fn new(email: String, password_hash: String, username: String) -> Self {
        Self {
            email,
            password_hash,
            username,
            role: DEFAULT_ROLE.to_string(),
            is_active: true,
        }
    }

    /// Materializes the row with the id the store allocated.
    pub fn into_user(self, id: i64) -> User {
        let now = Utc::now();
        User {
            id,
            email: self.email,
            password_hash: self.password_hash,
            username: self.username,
            role: self.role,
            is_active: self.is_active,
            created_at: now,
            updated_at: now,
        }
    }
}
