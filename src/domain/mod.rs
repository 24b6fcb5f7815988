pub mod onboarding;
pub mod route;
pub mod session;
pub mod user;
