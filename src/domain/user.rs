use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use validator::Validate;

/// Password login input.
#[derive(Clone, Serialize, Validate)]
pub struct Credentials {
    #[validate(length(min = 1, message = "id is required"))]
    pub id: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

impl Credentials {
    pub fn new(id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id: id.into().trim().to_string(),
            password: password.into(),
        }
    }
}

/// Signup fields accepted by `POST /api/auth/signup`.
#[derive(Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    #[validate(length(min = 1, message = "id is required"))]
    pub id: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 2, message = "nickname must be at least 2 characters"))]
    pub nickname: String,
    #[validate(email(message = "email is not valid"))]
    pub email: String,
    #[validate(length(min = 1, message = "gender is required"))]
    pub gender: String,
    pub birthday: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(url(message = "profile image must be a url"))]
    pub profile_image: Option<String>,
}

// Passwords never reach the logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("id", &self.id)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for SignupForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupForm")
            .field("id", &self.id)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("nickname", &self.nickname)
            .field("email", &self.email)
            .field("gender", &self.gender)
            .field("birthday", &self.birthday)
            .field("profile_image", &self.profile_image)
            .finish()
    }
}
