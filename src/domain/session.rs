use std::fmt;

use serde::{Deserialize, Serialize};

/// Access/refresh bearer pair as issued by the auth backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

// Tokens never reach the logs.
impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated,
    Refreshing,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Anonymous => "anonymous",
            SessionState::Authenticating => "authenticating",
            SessionState::Authenticated => "authenticated",
            SessionState::Refreshing => "refreshing",
        };
        f.write_str(name)
    }
}

/// Which navigation controls the page shows.
///
/// `LoggedIn` hides the login/signup controls and shows account/logout;
/// `LoggedOut` is the inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiVisibility {
    LoggedIn,
    LoggedOut,
}

/// Result of a session check against the validate endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// No tokens were stored, nothing was sent.
    NoSession,
    Valid,
    Invalid,
    /// A newer check or transition happened while this one was in flight; its
    /// result was dropped.
    Superseded,
}
