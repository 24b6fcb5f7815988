use validator::Validate;

use crate::domain::onboarding::{OnboardingForm, OnboardingOutcome};
use crate::usecase::contracts::{AuthApi, Form, Page, StoreKey, TokenStore};
use crate::usecase::error::{AuthResult, SessionError};
use crate::usecase::session::SessionManager;

const ONBOARDING_QUERY_FLAG: &str = "onboarding";
const ONBOARDING_FALLBACK: &str = "An error occurred while completing your profile.";

impl<S, A, P> SessionManager<S, A, P>
where
    S: TokenStore,
    A: AuthApi,
    P: Page,
{
    /// True only with explicit evidence of a fresh OAuth login: the
    /// `?onboarding=true` flag, or a stored session carrying the new-user
    /// marker.
    fn has_oauth_login_indicator(&self) -> bool {
        let flagged = self.page.query_param(ONBOARDING_QUERY_FLAG).as_deref() == Some("true");
        let marked = self.stored_tokens().is_some()
            && self.store.get(StoreKey::IsNewUser).as_deref() == Some("true");
        flagged || marked
    }

    /// Shows the profile-completion prompt when a fresh OAuth user still owes
    /// profile fields; otherwise clears stale onboarding markers.
    #[tracing::instrument(skip(self))]
    pub async fn check_onboarding(&self) -> OnboardingOutcome {
        if !self.has_oauth_login_indicator() {
            tracing::debug!("no oauth login indicator, onboarding check skipped");
            return OnboardingOutcome::Skipped;
        }

        let access = self.store.get(StoreKey::AccessToken);
        match self.api.onboarding_status(access).await {
            Ok(status) if status.needs_additional_info && self.stored_tokens().is_some() => {
                tracing::info!(user_id = ?status.user_id, "profile completion required");
                self.page.show_onboarding_prompt(&status);
                OnboardingOutcome::Prompted(status)
            }
            Ok(status) => {
                tracing::debug!(?status, "no onboarding needed");
                self.clear_onboarding_markers();
                OnboardingOutcome::Cleared
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch onboarding status");
                self.clear_onboarding_markers();
                OnboardingOutcome::Cleared
            }
        }
    }

    /// Submits the onboarding form. `userId`, `gender` and `birthday` are
    /// checked locally first; a form missing any of them never reaches the
    /// network.
    #[tracing::instrument(skip_all, fields(user_id = ?form.user_id))]
    pub async fn complete_onboarding(&self, form: OnboardingForm) -> AuthResult<()> {
        let form = form.normalized();
        if let Err(errors) = form.validate() {
            let err = SessionError::from(errors);
            tracing::debug!(error = %err, "onboarding form incomplete");
            self.page
                .show_error(Form::Onboarding, &err.user_message(ONBOARDING_FALLBACK));
            return Err(err);
        }

        let Some(access) = self.store.get(StoreKey::AccessToken) else {
            let err = SessionError::NoSession;
            self.page
                .show_error(Form::Onboarding, &err.user_message(ONBOARDING_FALLBACK));
            return Err(err);
        };

        if let Err(e) = self.api.complete_onboarding(&access, &form).await {
            let err = SessionError::from(e);
            tracing::info!(error = %err, "onboarding completion failed");
            self.page
                .show_error(Form::Onboarding, &err.user_message(ONBOARDING_FALLBACK));
            return Err(err);
        }

        tracing::info!("onboarding completed");
        self.clear_onboarding_markers();
        self.page.hide_onboarding_prompt();
        self.page.show_success(Form::Onboarding);
        self.restore().await;

        Ok(())
    }
}
