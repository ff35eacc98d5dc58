use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Account role. Every self-registered account starts as `User`.
/// Corresponds to the `user_role` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form profile fields supplied at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// A user record as held by the credential store.
///
/// `User` is deliberately not `Serialize`: anything leaving the process goes
/// through [`UserProfile`], which has no credential hash field.
#[derive(Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Builds a fresh `User` with a new id and the default role.
    pub fn new(username: &str, email: &str, password_hash: String, profile: Profile) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            role: Role::default(),
            first_name: profile.first_name,
            last_name: profile.last_name,
            created_at: now,
            updated_at: now,
        }
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("role", &self.role)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Public view of a user, safe to return from the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        UserProfile::from(&user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User::new(
            "alice",
            "a@x.com",
            "$2b$04$somethingthatlookslikeahash".to_string(),
            Profile {
                first_name: Some("A".to_string()),
                last_name: Some("L".to_string()),
            },
        )
    }

    #[test]
    fn test_new_user_defaults_to_user_role() {
        let user = sample_user();
        assert_eq!(user.role, Role::User);
        assert_eq!(user.created_at, user.updated_at);
        assert_eq!(user.first_name.as_deref(), Some("A"));
    }

    #[test]
    fn test_profile_view_has_no_hash() {
        let user = sample_user();
        let json = serde_json::to_value(UserProfile::from(&user)).unwrap();

        assert_eq!(json["username"], "alice");
        assert_eq!(json["role"], "USER");
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains(&user.password_hash));
    }

    #[test]
    fn test_debug_redacts_hash() {
        let user = sample_user();
        let rendered = format!("{:?}", user);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains(&user.password_hash));
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        let parsed: Role = serde_json::from_str("\"USER\"").unwrap();
        assert_eq!(parsed, Role::User);
    }
}
