/// User model
///
/// Accounts are soft-deleted: `active = false` hides a user from every read,
/// including login and token resolution. Credentials and reset state are
/// never serialized outward.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('user', 'guide', 'lead-guide', 'admin');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     email VARCHAR(255) NOT NULL,
///     photo VARCHAR(255) NOT NULL DEFAULT 'default.jpg',
///     role user_role NOT NULL DEFAULT 'user',
///     password_hash VARCHAR(255) NOT NULL,
///     password_changed_at TIMESTAMPTZ,
///     password_reset_token VARCHAR(64),
///     password_reset_expires TIMESTAMPTZ,
///     active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     version INTEGER NOT NULL DEFAULT 0,
///     CONSTRAINT users_email_key UNIQUE (email)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::Entity;
use crate::auth::roles::Role;
use crate::query::{Column, ColumnKind};
use crate::store::{Repository, Stores};

/// Photo assigned to accounts that never uploaded one
pub const DEFAULT_PHOTO: &str = "default.jpg";

/// A user account
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,

    pub name: String,

    /// Always stored lowercase
    pub email: String,

    pub photo: String,

    pub role: Role,

    /// Argon2id PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_changed_at: Option<DateTime<Utc>>,

    /// SHA-256 of the outstanding reset token
    #[serde(skip_serializing)]
    pub password_reset_token: Option<String>,

    #[serde(skip_serializing)]
    pub password_reset_expires: Option<DateTime<Utc>>,

    #[serde(skip_serializing)]
    pub active: bool,

    pub created_at: DateTime<Utc>,

    pub version: i32,
}

impl User {
    /// Whether the password changed after a token issued at `issued_at` (unix seconds)
    pub fn changed_password_after(&self, issued_at: i64) -> bool {
        self.password_changed_at
            .map(|changed| changed.timestamp() > issued_at)
            .unwrap_or(false)
    }

    /// Public fields only; safe to embed in other resources
    pub fn public_profile(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "email": self.email,
            "photo": self.photo,
            "role": self.role,
        })
    }
}

/// Input for inserting a user; the password is already hashed
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    #[validate(length(min = 1, message = "Please tell us your name!"))]
    pub name: String,

    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    pub password_hash: String,

    #[serde(default)]
    pub role: Role,

    pub photo: Option<String>,
}

/// Administrative update of a user
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUser {
    #[validate(length(min = 1, message = "Please tell us your name!"))]
    pub name: Option<String>,

    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,

    pub role: Option<Role>,

    pub photo: Option<String>,
}

/// Self-service profile change
///
/// Only `name` and `email` are applied. The password fields are read so the
/// handler can refuse them.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[validate(length(min = 1, message = "Please tell us your name!"))]
    pub name: Option<String>,

    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,

    #[serde(default)]
    pub password: Option<IgnoredAny>,

    #[serde(default)]
    pub password_confirm: Option<IgnoredAny>,
}

impl ProfileUpdate {
    pub fn touches_password(&self) -> bool {
        self.password.is_some() || self.password_confirm.is_some()
    }

    pub fn into_patch(self) -> UpdateUser {
        UpdateUser {
            name: self.name,
            email: self.email,
            ..Default::default()
        }
    }
}

/// Signup request body
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupInput {
    #[validate(length(min = 1, message = "Please tell us your name!"))]
    pub name: String,

    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords are not the same!"))]
    pub password_confirm: String,

    #[serde(default)]
    pub role: Role,
}

impl SignupInput {
    /// Row to insert once the password has been hashed
    pub fn into_create(self, password_hash: String) -> CreateUser {
        CreateUser {
            name: self.name,
            email: self.email,
            password_hash,
            role: self.role,
            photo: None,
        }
    }
}

/// New password with its confirmation, used by reset
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPassword {
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords are not the same!"))]
    pub password_confirm: String,
}

/// Logged-in password change
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    #[validate(length(min = 1, message = "Please provide your current password"))]
    pub password_current: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords are not the same!"))]
    pub password_confirm: String,
}

/// Lowercases and trims an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

const COLUMNS: &[Column] = &[
    Column::new("id", "id", ColumnKind::Uuid),
    Column::new("name", "name", ColumnKind::Text),
    Column::new("email", "email", ColumnKind::Text),
    Column::new("role", "role", ColumnKind::Enum),
    Column::new("createdAt", "created_at", ColumnKind::Timestamp),
];

impl Entity for User {
    type Create = CreateUser;
    type Patch = UpdateUser;

    const NAME: &'static str = "user";
    const COLUMNS: &'static [Column] = COLUMNS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn repository(stores: &Stores) -> &dyn Repository<Self> {
        stores.users.as_repository()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_profile_update_types_are_checked() {
        let update: ProfileUpdate =
            serde_json::from_value(json!({"name": "Renamed", "role": "admin"})).unwrap();
        assert!(!update.touches_password());
        let patch = update.into_patch();
        assert_eq!(patch.name.as_deref(), Some("Renamed"));
        assert!(patch.role.is_none());

        let wrong = serde_json::from_value::<ProfileUpdate>(json!({"email": 5}));
        assert!(wrong.is_err());

        let sneaky: ProfileUpdate =
            serde_json::from_value(json!({"passwordConfirm": "pass1234"})).unwrap();
        assert!(sneaky.touches_password());
    }

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Jonas Schmedtmann".to_string(),
            email: "admin@natours.io".to_string(),
            photo: DEFAULT_PHOTO.to_string(),
            role: Role::Admin,
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            password_changed_at: None,
            password_reset_token: Some("deadbeef".to_string()),
            password_reset_expires: Some(Utc::now()),
            active: true,
            created_at: Utc::now(),
            version: 0,
        }
    }

    #[test]
    fn test_serialized_user_hides_secrets() {
        let value = serde_json::to_value(user()).unwrap();
        let object = value.as_object().unwrap();

        assert!(!object.contains_key("password"));
        assert!(!object.contains_key("passwordHash"));
        assert!(!object.contains_key("passwordResetToken"));
        assert!(!object.contains_key("passwordResetExpires"));
        assert!(!object.contains_key("active"));
        assert_eq!(object["role"], "admin");
        assert_eq!(object["email"], "admin@natours.io");
    }

    #[test]
    fn test_changed_password_after() {
        let mut account = user();
        let issued_at = Utc::now().timestamp();
        assert!(!account.changed_password_after(issued_at));

        account.password_changed_at = Some(Utc::now() + Duration::seconds(30));
        assert!(account.changed_password_after(issued_at));

        account.password_changed_at = Some(Utc::now() - Duration::hours(1));
        assert!(!account.changed_password_after(issued_at));
    }

    #[test]
    fn test_signup_requires_matching_confirmation() {
        let signup: SignupInput = serde_json::from_value(json!({
            "name": "Test",
            "email": "test@example.com",
            "password": "pass1234",
            "passwordConfirm": "pass12345"
        }))
        .unwrap();
        assert!(signup.validate().is_err());
    }

    #[test]
    fn test_signup_rules() {
        let valid: SignupInput = serde_json::from_value(json!({
            "name": "Test",
            "email": "test@example.com",
            "password": "pass1234",
            "passwordConfirm": "pass1234"
        }))
        .unwrap();
        assert!(valid.validate().is_ok());
        assert_eq!(valid.role, Role::User);

        let short: SignupInput = serde_json::from_value(json!({
            "name": "Test",
            "email": "test@example.com",
            "password": "short",
            "passwordConfirm": "short"
        }))
        .unwrap();
        assert!(short.validate().is_err());

        let bad_email: SignupInput = serde_json::from_value(json!({
            "name": "Test",
            "email": "not-an-email",
            "password": "pass1234",
            "passwordConfirm": "pass1234"
        }))
        .unwrap();
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Admin@Natours.IO "), "admin@natours.io");
    }
}
