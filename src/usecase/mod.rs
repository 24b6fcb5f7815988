pub mod contracts;
pub mod error;
pub mod oauth;
pub mod onboarding;
pub mod sequence;
pub mod session;
