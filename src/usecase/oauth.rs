use crate::domain::route::Route;
use crate::usecase::contracts::{AuthApi, Form, Page, StoreKey, TokenStore};
use crate::usecase::error::{AuthResult, SessionError};
use crate::usecase::session::SessionManager;

impl<S, A, P> SessionManager<S, A, P>
where
    S: TokenStore,
    A: AuthApi,
    P: Page,
{
    /// Handles the provider callback landing on `/oauth2/redirect`.
    ///
    /// `?error=...` is shown and returned as a rejection. `?token=...` is
    /// stored as the access token, together with `refresh_token`,
    /// `is_new_user` and `user_id` when the backend passed them along, and the
    /// page moves home where the next `restore` validates it. Whatever the
    /// previous session stored is dropped first.
    #[tracing::instrument(skip(self))]
    pub fn handle_oauth_redirect(&self) -> AuthResult<()> {
        if let Some(error) = self.page.query_param("error") {
            tracing::warn!(%error, "oauth provider returned an error");
            self.page.show_error(Form::OAuth, &error);
            return Err(SessionError::Rejected(Some(error)));
        }

        let Some(token) = self.page.query_param("token").filter(|t| !t.is_empty()) else {
            let err = SessionError::Validation("oauth redirect carried no token".to_string());
            self.page.show_error(Form::OAuth, &err.to_string());
            return Err(err);
        };

        let refresh = self.page.query_param("refresh_token").filter(|t| !t.is_empty());
        let is_new_user = self.page.query_param("is_new_user").as_deref() == Some("true");
        let user_id = self
            .page
            .query_param("user_id")
            .and_then(|v| v.parse::<i64>().ok());

        // nothing from the previous session may survive next to the new token
        self.replace_session(|store| {
            store.set(StoreKey::AccessToken, &token)?;
            if let Some(refresh) = &refresh {
                store.set(StoreKey::RefreshToken, refresh)?;
            }
            if is_new_user {
                store.set(StoreKey::IsNewUser, "true")?;
            }
            if let Some(user_id) = user_id {
                store.set(StoreKey::UserId, &user_id.to_string())?;
            }
            Ok(())
        })?;

        tracing::info!("oauth login stored");
        self.page.navigate(Route::Home);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use mockall::predicate::eq;

    use super::*;
    use crate::repository::store::MemoryTokenStore;
    use crate::usecase::contracts::{MockAuthApi, MockPage};
    use crate::usecase::session::SessionSettings;

    fn redirect_page(params: &[(&str, &str)]) -> MockPage {
        let query: HashMap<String, String> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut page = MockPage::new();
        page.expect_query_param()
            .returning(move |name| query.get(name).cloned());
        page
    }

    #[test]
    fn test_redirect_with_token_stores_and_goes_home() {
        let mut page = redirect_page(&[
            ("token", "A"),
            ("refresh_token", "R"),
            ("is_new_user", "true"),
            ("user_id", "42"),
        ]);
        page.expect_navigate()
            .with(eq(Route::Home))
            .times(1)
            .return_const(());

        let manager = SessionManager::new(
            MemoryTokenStore::new(),
            MockAuthApi::new(),
            page,
            SessionSettings::default(),
        );

        manager.handle_oauth_redirect().unwrap();

        let store = manager.store();
        assert_eq!(store.get(StoreKey::AccessToken), Some("A".to_string()));
        assert_eq!(store.get(StoreKey::RefreshToken), Some("R".to_string()));
        assert_eq!(store.get(StoreKey::IsNewUser), Some("true".to_string()));
        assert_eq!(store.get(StoreKey::UserId), Some("42".to_string()));
    }

    #[test]
    fn test_redirect_ignores_malformed_user_id() {
        let mut page = redirect_page(&[("token", "A"), ("user_id", "abc")]);
        page.expect_navigate().times(1).return_const(());

        let manager = SessionManager::new(
            MemoryTokenStore::new(),
            MockAuthApi::new(),
            page,
            SessionSettings::default(),
        );

        manager.handle_oauth_redirect().unwrap();

        assert_eq!(manager.store().get(StoreKey::UserId), None);
        assert_eq!(manager.store().get(StoreKey::IsNewUser), None);
    }

    #[test]
    fn test_redirect_replaces_previous_session() {
        let store = MemoryTokenStore::new();
        store.set(StoreKey::AccessToken, "OLD_A").unwrap();
        store.set(StoreKey::RefreshToken, "OLD_R").unwrap();
        store.set(StoreKey::IsNewUser, "true").unwrap();
        store.set(StoreKey::UserId, "7").unwrap();
        let mut page = redirect_page(&[("token", "NEW_A")]);
        page.expect_navigate().times(1).return_const(());

        let manager =
            SessionManager::new(store, MockAuthApi::new(), page, SessionSettings::default());

        manager.handle_oauth_redirect().unwrap();

        let store = manager.store();
        assert_eq!(store.get(StoreKey::AccessToken), Some("NEW_A".to_string()));
        assert_eq!(store.get(StoreKey::RefreshToken), None);
        assert_eq!(store.get(StoreKey::IsNewUser), None);
        assert_eq!(store.get(StoreKey::UserId), None);
        assert!(manager.stored_tokens().is_none());
    }

    #[test]
    fn test_redirect_with_error_is_shown() {
        let mut page = redirect_page(&[("error", "access_denied")]);
        page.expect_show_error()
            .withf(|form, message| *form == Form::OAuth && message == "access_denied")
            .times(1)
            .return_const(());
        page.expect_navigate().times(0);

        let manager = SessionManager::new(
            MemoryTokenStore::new(),
            MockAuthApi::new(),
            page,
            SessionSettings::default(),
        );

        let err = manager.handle_oauth_redirect().unwrap_err();

        assert!(matches!(err, SessionError::Rejected(Some(ref m)) if m == "access_denied"));
        assert_eq!(manager.store().get(StoreKey::AccessToken), None);
    }

    #[test]
    fn test_redirect_without_token() {
        let mut page = redirect_page(&[]);
        page.expect_show_error().times(1).return_const(());
        page.expect_navigate().times(0);

        let manager = SessionManager::new(
            MemoryTokenStore::new(),
            MockAuthApi::new(),
            page,
            SessionSettings::default(),
        );

        let err = manager.handle_oauth_redirect().unwrap_err();

        assert!(err.is_validation());
    }
}
