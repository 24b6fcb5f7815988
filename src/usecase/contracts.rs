use crate::domain::onboarding::{OnboardingForm, OnboardingStatus};
use crate::domain::route::Route;
use crate::domain::session::{TokenPair, UiVisibility};
use crate::domain::user::{Credentials, SignupForm};
use crate::repository::errors::{ApiError, RepositoryError};

/// Keys of the session store. Names follow the cookie layout the backend also
/// sets on browser clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    AccessToken,
    RefreshToken,
    IsNewUser,
    UserId,
}

impl StoreKey {
    pub const ALL: [StoreKey; 4] = [
        StoreKey::AccessToken,
        StoreKey::RefreshToken,
        StoreKey::IsNewUser,
        StoreKey::UserId,
    ];

    pub const ONBOARDING_MARKERS: [StoreKey; 2] = [StoreKey::IsNewUser, StoreKey::UserId];

    pub fn as_str(self) -> &'static str {
        match self {
            StoreKey::AccessToken => "access_token",
            StoreKey::RefreshToken => "refresh_token",
            StoreKey::IsNewUser => "is_new_user",
            StoreKey::UserId => "user_id",
        }
    }
}

/// Synchronous key/value capability holding the session tokens and the
/// onboarding markers.
#[cfg_attr(test, mockall::automock)]
pub trait TokenStore: Send + Sync {
    fn get(&self, key: StoreKey) -> Option<String>;
    fn set(&self, key: StoreKey, value: &str) -> Result<(), RepositoryError>;
    fn remove(&self, key: StoreKey) -> Result<(), RepositoryError>;
    fn clear(&self) -> Result<(), RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait AuthApi: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<TokenPair, ApiError>;
    async fn signup(&self, form: &SignupForm) -> Result<(), ApiError>;
    async fn logout(&self, refresh_token: Option<String>) -> Result<(), ApiError>;
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError>;
    /// HTTP 200 means valid; every other outcome, transport errors included,
    /// is invalid.
    async fn validate(&self, access_token: &str) -> bool;
    async fn onboarding_status(
        &self,
        access_token: Option<String>,
    ) -> Result<OnboardingStatus, ApiError>;
    async fn complete_onboarding(
        &self,
        access_token: &str,
        form: &OnboardingForm,
    ) -> Result<(), ApiError>;
}

/// Form a success or error indicator belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    Login,
    Signup,
    Onboarding,
    OAuth,
}

/// Presentation side of the session: whatever shows the navigation controls,
/// the forms and the onboarding prompt.
#[cfg_attr(test, mockall::automock)]
pub trait Page: Send + Sync {
    fn current_path(&self) -> String;
    fn query_param(&self, name: &str) -> Option<String>;
    fn render(&self, visibility: UiVisibility);
    fn show_success(&self, form: Form);
    fn show_error(&self, form: Form, message: &str);
    fn show_onboarding_prompt(&self, status: &OnboardingStatus);
    fn hide_onboarding_prompt(&self);
    fn navigate(&self, route: Route);
}
