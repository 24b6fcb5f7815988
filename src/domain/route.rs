use std::fmt;

/// Pages the session manager navigates between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    /// Account-only page; requires a valid session.
    Account,
    OAuthRedirect,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::Account => "/mypage",
            Route::OAuthRedirect => "/oauth2/redirect",
        }
    }

    pub fn matches(self, path: &str) -> bool {
        path == self.path()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Naver,
}

impl OAuthProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Naver => "naver",
        }
    }
}

impl std::str::FromStr for OAuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(OAuthProvider::Google),
            "naver" => Ok(OAuthProvider::Naver),
            other => Err(format!("unsupported oauth provider: {}", other)),
        }
    }
}
