//! User domain entity and related types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::entity::{Entity, EntityDescriptor};

/// Persisted shape of [`User`].
pub static USERS: EntityDescriptor = EntityDescriptor {
    name: "User",
    collection: "users",
    fields: &["id", "username", "email", "password"],
    indexed_fields: &["username", "email"],
    default_order: &[],
};

/// User domain entity.
///
/// `password` holds the Argon2 hash once the user has been stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    pub password: String,
}

impl User {
    /// Build an unsaved user from registration data.
    pub fn from_data(data: UserData) -> Self {
        Self {
            id: None,
            username: data.username,
            email: data.email,
            password: data.password,
        }
    }
}

impl Entity for User {
    type Data = UserData;

    fn descriptor() -> &'static EntityDescriptor {
        &USERS
    }

    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = Some(id);
    }
}

/// Registration and profile update payload.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserData {
    /// Unique login name
    #[validate(length(min = 1, message = "Username must not be empty"))]
    pub username: String,
    /// Unique email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    /// Plain-text password, hashed before it reaches the store
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

impl From<UserData> for User {
    fn from(data: UserData) -> Self {
        User::from_data(data)
    }
}

/// User response (safe to return to client)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserResponse {
    /// Unique user identifier
    pub id: Option<Uuid>,
    pub username: String,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        User::from_data(UserData {
            username: "alice".to_string(),
            email: "alice@x.com".to_string(),
            password: "qwe123qwe123".to_string(),
        })
    }

    #[test]
    fn test_unsaved_user_has_no_id() {
        let user = sample();
        assert_eq!(user.id(), None);

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_id_round_trips_through_json() {
        let mut user = sample();
        let id = Uuid::new_v4();
        user.set_id(id);

        let json = serde_json::to_value(&user).unwrap();
        let back: User = serde_json::from_value(json).unwrap();
        assert_eq!(back.id, Some(id));
    }

    #[test]
    fn test_invalid_email_fails_validation() {
        let mut user = sample();
        user.email = "not-an-email".to_string();

        let errors = user.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn test_response_hides_password() {
        let response = UserResponse::from(&sample());
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("qwe123qwe123"));
    }
}
