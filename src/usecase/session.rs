use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use validator::Validate;

use crate::domain::route::Route;
use crate::domain::session::{CheckOutcome, SessionState, TokenPair, UiVisibility};
use crate::domain::user::{Credentials, SignupForm};
use crate::repository::errors::RepositoryError;
use crate::usecase::contracts::{AuthApi, Form, Page, StoreKey, TokenStore};
use crate::usecase::error::{AuthResult, SessionError};
use crate::usecase::sequence::{CheckSequencer, Epoch, SessionEpochs};

const LOGIN_FALLBACK: &str = "Login failed. Please try again.";
const SIGNUP_FALLBACK: &str = "Registration failed. Please try again.";

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Period of the keep-alive refresh.
    pub refresh_interval: Duration,
    /// Pause between the login success indicator and the redirect home.
    pub login_redirect_delay: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(5 * 60),
            login_redirect_delay: Duration::from_millis(1000),
        }
    }
}

/// Client-side view of the authentication session.
///
/// Holds the token store, talks to the auth API and keeps the page's
/// logged-in/logged-out controls in line with the last applied check. Every
/// transition goes through [`SessionManager::start_session`] or
/// [`SessionManager::end_session`], both idempotent.
pub struct SessionManager<S, A, P>
where
    S: TokenStore,
    A: AuthApi,
    P: Page,
{
    pub(super) store: S,
    pub(super) api: A,
    pub(super) page: P,
    settings: SessionSettings,
    checks: CheckSequencer,
    epochs: SessionEpochs,
    state: Mutex<SessionState>,
    rendered: Mutex<UiVisibility>,
}

impl<S, A, P> SessionManager<S, A, P>
where
    S: TokenStore,
    A: AuthApi,
    P: Page,
{
    pub fn new(store: S, api: A, page: P, settings: SessionSettings) -> Self {
        Self {
            store,
            api,
            page,
            settings,
            checks: CheckSequencer::new(),
            epochs: SessionEpochs::new(),
            state: Mutex::new(SessionState::Anonymous),
            rendered: Mutex::new(UiVisibility::LoggedOut),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn state(&self) -> SessionState {
        *self.lock_state()
    }

    /// Surface last rendered on the page. In-flight states keep the surface
    /// they started from.
    pub fn visibility(&self) -> UiVisibility {
        *self.rendered.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Both tokens, or nothing. Absence is a normal state.
    pub fn stored_tokens(&self) -> Option<TokenPair> {
        let access = self.store.get(StoreKey::AccessToken)?;
        let refresh = self.store.get(StoreKey::RefreshToken)?;
        Some(TokenPair::new(access, refresh))
    }

    /// Asks the backend whether `token` is still accepted. Never fails; any
    /// error counts as invalid.
    pub async fn validate(&self, token: &str) -> bool {
        let valid = self.api.validate(token).await;
        tracing::debug!(valid, "token validated");
        valid
    }

    /// Derives the initial state from the stored tokens (page load).
    ///
    /// A token the backend rejects ends the session locally without
    /// navigating away.
    #[tracing::instrument(skip(self))]
    pub async fn restore(&self) -> CheckOutcome {
        let ticket = self.checks.issue();

        let Some(access) = self.store.get(StoreKey::AccessToken) else {
            let mut state = self.lock_state();
            if !self.checks.is_latest(ticket) {
                return CheckOutcome::Superseded;
            }
            *state = SessionState::Anonymous;
            self.render(UiVisibility::LoggedOut);
            tracing::debug!("no stored session");
            return CheckOutcome::NoSession;
        };

        let valid = self.validate(&access).await;
        self.settle_check(ticket, valid)
    }

    /// Guards navigation to the account-only page with a fresh validation.
    #[tracing::instrument(skip(self))]
    pub async fn open_account(&self) -> CheckOutcome {
        let Some(access) = self.store.get(StoreKey::AccessToken) else {
            self.page.navigate(Route::Login);
            return CheckOutcome::NoSession;
        };

        let ticket = self.checks.issue();
        let valid = self.validate(&access).await;
        let outcome = self.settle_check(ticket, valid);

        match outcome {
            CheckOutcome::Valid => self.page.navigate(Route::Account),
            CheckOutcome::Invalid => self.page.navigate(Route::Login),
            CheckOutcome::NoSession | CheckOutcome::Superseded => {}
        }
        outcome
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, id: &str, password: &str) -> AuthResult<TokenPair> {
        let credentials = Credentials::new(id, password);
        if let Err(errors) = credentials.validate() {
            let err = SessionError::from(errors);
            self.page.show_error(Form::Login, &err.user_message(LOGIN_FALLBACK));
            return Err(err);
        }

        let issued = self.epochs.current();
        let previous = self.transition(SessionState::Authenticating);

        let pair = match self.api.login(&credentials).await {
            Ok(pair) => pair,
            Err(e) => {
                let err = SessionError::from(e);
                tracing::info!(error = %err, "login failed");
                metrics::counter!("session_login_total", "outcome" => "failure").increment(1);
                self.revert(SessionState::Authenticating, previous);
                self.page.show_error(Form::Login, &err.user_message(LOGIN_FALLBACK));
                return Err(err);
            }
        };

        match self.start_session(&pair, |now| issued.ended_before(now)) {
            Ok(()) => {}
            Err(SessionError::Superseded) => {
                tracing::info!("session ended while logging in, login discarded");
                self.revert(SessionState::Authenticating, previous);
                return Err(SessionError::Superseded);
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to store tokens after login");
                self.revert(SessionState::Authenticating, previous);
                self.page.show_error(Form::Login, &err.user_message(LOGIN_FALLBACK));
                return Err(err);
            }
        }
        // a password login never carries OAuth onboarding state
        self.clear_onboarding_markers();

        metrics::counter!("session_login_total", "outcome" => "success").increment(1);
        tracing::info!("login succeeded");

        self.page.show_success(Form::Login);
        if !self.settings.login_redirect_delay.is_zero() {
            tokio::time::sleep(self.settings.login_redirect_delay).await;
        }
        self.page.navigate(Route::Home);

        Ok(pair)
    }

    /// Registers an account. Does not log in; the user is sent to the login
    /// page instead.
    #[tracing::instrument(skip_all, fields(id = %form.id))]
    pub async fn signup(&self, form: &SignupForm) -> AuthResult<()> {
        if let Err(errors) = form.validate() {
            let err = SessionError::from(errors);
            self.page.show_error(Form::Signup, &err.user_message(SIGNUP_FALLBACK));
            return Err(err);
        }

        match self.api.signup(form).await {
            Ok(()) => {
                tracing::info!("signup succeeded");
                self.page.show_success(Form::Signup);
                self.page.navigate(Route::Login);
                Ok(())
            }
            Err(e) => {
                let err = SessionError::from(e);
                tracing::info!(error = %err, "signup failed");
                self.page.show_error(Form::Signup, &err.user_message(SIGNUP_FALLBACK));
                Err(err)
            }
        }
    }

    /// Exchanges the refresh token for a new pair. Any failure, a missing
    /// session included, logs the user out. A response that arrives after the
    /// session was ended or replaced is dropped with
    /// [`SessionError::Superseded`] and leaves the current session alone.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self) -> AuthResult<TokenPair> {
        let Some(tokens) = self.stored_tokens() else {
            tracing::info!("refresh without a stored session");
            metrics::counter!("session_refresh_total", "outcome" => "failure").increment(1);
            self.logout().await;
            return Err(SessionError::NoSession);
        };

        let issued = self.epochs.current();
        self.transition(SessionState::Refreshing);

        let result = match self.api.refresh(&tokens.refresh_token).await {
            Ok(pair) => self
                .start_session(&pair, |now| issued.changed_before(now))
                .map(|()| pair),
            Err(e) if issued.changed_before(self.epochs.current()) => {
                tracing::debug!(error = %e, "refresh failed for a session that is gone");
                Err(SessionError::Superseded)
            }
            Err(e) => Err(SessionError::from(e)),
        };

        match result {
            Ok(pair) => {
                metrics::counter!("session_refresh_total", "outcome" => "success").increment(1);
                tracing::debug!("tokens refreshed");
                Ok(pair)
            }
            Err(SessionError::Superseded) => {
                tracing::info!("session changed during refresh, response discarded");
                Err(SessionError::Superseded)
            }
            Err(err) => {
                metrics::counter!("session_refresh_total", "outcome" => "failure").increment(1);
                tracing::info!(error = %err, "token refresh failed, logging out");
                self.logout().await;
                Err(err)
            }
        }
    }

    /// Tells the backend (best effort), drops every stored key and leaves the
    /// current page: the account page goes home, anything else to login.
    #[tracing::instrument(skip(self))]
    pub async fn logout(&self) {
        let refresh_token = self.store.get(StoreKey::RefreshToken);
        if let Err(e) = self.api.logout(refresh_token).await {
            tracing::debug!(error = %e, "logout call failed, clearing session anyway");
        }

        self.end_session();
        metrics::counter!("session_logout_total").increment(1);

        let target = if Route::Account.matches(&self.page.current_path()) {
            Route::Home
        } else {
            Route::Login
        };
        tracing::info!(%target, "logged out");
        self.page.navigate(target);
    }

    /// Refreshes on a fixed interval until `shutdown` resolves or a refresh
    /// ends the session. Returns immediately when nothing is stored.
    pub async fn run_keepalive<F: Future>(&self, shutdown: F) {
        if self.stored_tokens().is_none() {
            tracing::debug!("no stored session, keep-alive not armed");
            return;
        }

        let period = self.settings.refresh_interval;
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_secs = period.as_secs(), "keep-alive armed");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("keep-alive stopped");
                    break;
                }
                _ = interval.tick() => match self.refresh().await {
                    Ok(_) => {}
                    Err(SessionError::Superseded) if self.stored_tokens().is_some() => {
                        tracing::debug!("refresh superseded by a newer session");
                    }
                    Err(_) => {
                        tracing::info!("session ended, keep-alive stopped");
                        break;
                    }
                },
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn transition(&self, next: SessionState) -> SessionState {
        let mut state = self.lock_state();
        let previous = std::mem::replace(&mut *state, next);
        tracing::debug!(from = %previous, to = %next, "session transition");
        previous
    }

    /// Puts back `previous` unless something else moved the state on.
    fn revert(&self, expected: SessionState, previous: SessionState) {
        let mut state = self.lock_state();
        if *state == expected {
            *state = previous;
        }
    }

    fn settle_check(&self, ticket: u64, valid: bool) -> CheckOutcome {
        let mut state = self.lock_state();
        if !self.checks.is_latest(ticket) {
            metrics::counter!("session_checks_discarded_total").increment(1);
            tracing::debug!(ticket, valid, "stale session check discarded");
            return CheckOutcome::Superseded;
        }

        if valid {
            *state = SessionState::Authenticated;
            self.render(UiVisibility::LoggedIn);
            CheckOutcome::Valid
        } else {
            tracing::info!("stored token rejected, ending session");
            self.end_session_locked(&mut state);
            CheckOutcome::Invalid
        }
    }

    fn render(&self, visibility: UiVisibility) {
        *self.rendered.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = visibility;
        self.page.render(visibility);
    }

    /// Stores `pair` unless `is_stale` says a transition since the request
    /// was issued makes it obsolete.
    fn start_session(
        &self,
        pair: &TokenPair,
        is_stale: impl FnOnce(Epoch) -> bool,
    ) -> AuthResult<()> {
        let mut state = self.lock_state();
        if is_stale(self.epochs.current()) {
            metrics::counter!("session_checks_discarded_total").increment(1);
            return Err(SessionError::Superseded);
        }
        self.store.set(StoreKey::AccessToken, &pair.access_token)?;
        self.store.set(StoreKey::RefreshToken, &pair.refresh_token)?;
        self.checks.advance();
        self.epochs.mark_started();
        *state = SessionState::Authenticated;
        self.render(UiVisibility::LoggedIn);
        Ok(())
    }

    pub(super) fn end_session(&self) {
        let mut state = self.lock_state();
        self.end_session_locked(&mut state);
    }

    fn end_session_locked(&self, state: &mut SessionState) {
        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "failed to clear token store");
        }
        self.checks.advance();
        self.epochs.mark_ended();
        *state = SessionState::Anonymous;
        self.render(UiVisibility::LoggedOut);
    }

    /// Replaces every stored key with what `write` puts in. Checks and
    /// refreshes issued for the previous session are dropped.
    pub(super) fn replace_session(
        &self,
        write: impl FnOnce(&S) -> Result<(), RepositoryError>,
    ) -> AuthResult<()> {
        let _state = self.lock_state();
        self.checks.advance();
        self.epochs.mark_ended();
        self.epochs.mark_started();
        self.store.clear()?;
        write(&self.store)?;
        Ok(())
    }

    pub(super) fn clear_onboarding_markers(&self) {
        for key in StoreKey::ONBOARDING_MARKERS {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(error = %e, key = key.as_str(), "failed to clear onboarding marker");
            }
        }
    }
}
