//! User domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Admin,
    Mentor,
    Member,
    #[default]
    Student,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Admin => "admin",
            UserType::Mentor => "mentor",
            UserType::Member => "member",
            UserType::Student => "student",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(UserType::Admin),
            "mentor" => Ok(UserType::Mentor),
            "member" => Ok(UserType::Member),
            "student" => Ok(UserType::Student),
            other => Err(format!("Invalid user type: {}", other)),
        }
    }
}

/// A stored user account
///
/// `password_hash` is always an Argon2 PHC string, never plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub surname: String,
    pub user_type: UserType,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub password_changed_at: Option<DateTime<Utc>>,
}

impl User {
    /// Build a new, active account with a fresh id
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        name: impl Into<String>,
        surname: impl Into<String>,
        user_type: UserType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: normalize_email(&email.into()),
            password_hash: password_hash.into(),
            name: name.into(),
            surname: surname.into(),
            user_type,
            active: true,
            created_at: now,
            updated_at: now,
            password_changed_at: None,
        }
    }

    /// Password-free view of this user
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            surname: self.surname.clone(),
            user_type: self.user_type,
            active: self.active,
            created_at: self.created_at,
        }
    }
}

/// Registration input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: String,
    pub surname: String,
    #[serde(default)]
    pub user_type: Option<String>,
}

impl NewUser {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        name: impl Into<String>,
        surname: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            name: name.into(),
            surname: surname.into(),
            user_type: None,
        }
    }

    pub fn with_user_type(mut self, user_type: impl Into<String>) -> Self {
        self.user_type = Some(user_type.into());
        self
    }

    /// Copy with surrounding whitespace stripped; the password is kept verbatim
    pub fn trimmed(&self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            name: self.name.trim().to_string(),
            surname: self.surname.trim().to_string(),
            user_type: self.user_type.as_ref().map(|t| t.trim().to_string()),
        }
    }

    /// Name of the first required field that is empty, if any
    pub fn first_missing_field(&self) -> Option<&'static str> {
        [
            ("username", &self.username),
            ("email", &self.email),
            ("password", &self.password),
            ("name", &self.name),
            ("surname", &self.surname),
        ]
        .into_iter()
        .find(|(_, value)| value.is_empty())
        .map(|(field, _)| field)
    }
}

/// Sanitized user data safe to hand to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: String,
    pub surname: String,
    pub user_type: UserType,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Emails compare case-insensitively; they are stored lower-cased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_creation() {
        let user = User::new("testuser", "Test@Example.com", "$argon2id$x", "Test", "User", UserType::Student);
        assert_eq!(user.username, "testuser");
        assert_eq!(user.email, "test@example.com");
        assert!(user.active);
        assert!(user.password_changed_at.is_none());
    }

    #[test]
    fn test_profile_has_no_password() {
        let user = User::new("testuser", "test@example.com", "$argon2id$secret", "Test", "User", UserType::Mentor);
        let json = serde_json::to_string(&user.profile()).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"user_type\":\"mentor\""));
    }

    #[test]
    fn test_user_type_parsing() {
        assert_eq!("Admin".parse::<UserType>(), Ok(UserType::Admin));
        assert_eq!(" student ".parse::<UserType>(), Ok(UserType::Student));
        assert!("wizard".parse::<UserType>().is_err());
    }

    #[test]
    fn test_first_missing_field() {
        let data = NewUser::new("testuser", "test@example.com", "password123", "", "User");
        assert_eq!(data.first_missing_field(), Some("name"));

        let blank = NewUser::new("  ", "a@b.co", "password123", "Test", "User").trimmed();
        assert_eq!(blank.first_missing_field(), Some("username"));

        let full = NewUser::new("testuser", "test@example.com", "password123", "Test", "User");
        assert_eq!(full.first_missing_field(), None);
    }
}
