use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use reqwest::Url;

use crate::domain::onboarding::OnboardingStatus;
use crate::domain::route::Route;
use crate::domain::session::UiVisibility;
use crate::usecase::contracts::{Form, Page};

const PAGE_ORIGIN: &str = "http://localhost/";

/// Headless page for the command line runner. Every UI effect becomes a
/// structured log line; navigation only moves the current path.
pub struct ConsolePage {
    path: Mutex<String>,
    query: HashMap<String, String>,
    visibility: Mutex<Option<UiVisibility>>,
    prompt_open: Mutex<bool>,
}

impl ConsolePage {
    /// `location` is a path with an optional query, e.g.
    /// `/oauth2/redirect?token=abc`.
    pub fn new(location: &str) -> Self {
        let parsed = Url::parse(PAGE_ORIGIN).and_then(|base| base.join(location));
        let (path, query) = match parsed {
            Ok(url) => (
                url.path().to_string(),
                url.query_pairs().into_owned().collect(),
            ),
            Err(e) => {
                tracing::warn!(location, error = %e, "unparseable page location, query ignored");
                (location.to_string(), HashMap::new())
            }
        };

        Self {
            path: Mutex::new(path),
            query,
            visibility: Mutex::new(None),
            prompt_open: Mutex::new(false),
        }
    }

    /// Last rendered visibility, if anything was rendered yet.
    pub fn visibility(&self) -> Option<UiVisibility> {
        *lock(&self.visibility)
    }

    pub fn prompt_open(&self) -> bool {
        *lock(&self.prompt_open)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Page for ConsolePage {
    fn current_path(&self) -> String {
        lock(&self.path).clone()
    }

    fn query_param(&self, name: &str) -> Option<String> {
        self.query.get(name).cloned()
    }

    fn render(&self, visibility: UiVisibility) {
        let mut current = lock(&self.visibility);
        if *current != Some(visibility) {
            tracing::info!(?visibility, "navigation controls updated");
        }
        *current = Some(visibility);
    }

    fn show_success(&self, form: Form) {
        tracing::info!(?form, "form submitted successfully");
    }

    fn show_error(&self, form: Form, message: &str) {
        tracing::warn!(?form, error = message, "form error");
    }

    fn show_onboarding_prompt(&self, status: &OnboardingStatus) {
        *lock(&self.prompt_open) = true;
        tracing::info!(
            user_id = ?status.user_id,
            "additional profile information required: nickname, gender, birthday"
        );
    }

    fn hide_onboarding_prompt(&self) {
        *lock(&self.prompt_open) = false;
        tracing::debug!("onboarding prompt closed");
    }

    fn navigate(&self, route: Route) {
        let mut path = lock(&self.path);
        tracing::info!(from = %path, to = %route, "navigating");
        *path = route.path().to_string();
    }
}
