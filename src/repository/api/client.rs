use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::{DeserializeOwned, IgnoredAny};

use super::contracts::{Envelope, LogoutRequest, RefreshRequest};
use crate::domain::onboarding::{OnboardingForm, OnboardingStatus};
use crate::domain::route::{OAuthProvider, Route};
use crate::domain::session::TokenPair;
use crate::domain::user::{Credentials, SignupForm};
use crate::repository::errors::ApiError;
use crate::usecase::contracts::AuthApi;

const LOGIN_PATH: &str = "/api/auth/login";
const SIGNUP_PATH: &str = "/api/auth/signup";
const LOGOUT_PATH: &str = "/api/auth/logout";
const REFRESH_PATH: &str = "/api/auth/refresh";
const VALIDATE_PATH: &str = "/api/auth/validate";
const ONBOARDING_STATUS_PATH: &str = "/api/oauth2/onboarding/status";
const ONBOARDING_COMPLETE_PATH: &str = "/api/oauth2/complete";

/// HTTP client for the auth backend.
///
/// Built once at startup. Every call goes through [`ApiClient::request`];
/// calls that need the bearer header go through [`ApiClient::authorized`], which
/// is the only place the `Authorization` header is attached.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = Client::builder()
            .user_agent("GuideHelper/1.0")
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build http client: {}", e)))?;

        tracing::info!(%base_url, "auth api client created");

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }

    fn authorized(&self, method: Method, path: &str, access_token: &str) -> RequestBuilder {
        self.request(method, path).bearer_auth(access_token)
    }

    /// Browser URL that starts the provider's authorization flow and comes
    /// back to `{origin}/oauth2/redirect`.
    pub fn authorization_url(
        &self,
        provider: OAuthProvider,
        origin: &str,
    ) -> Result<Url, ApiError> {
        let redirect_uri = format!(
            "{}{}",
            origin.trim_end_matches('/'),
            Route::OAuthRedirect.path()
        );
        let base = format!("{}/oauth2/authorization/{}", self.base_url, provider.as_str());

        Url::parse_with_params(&base, &[("redirect_uri", redirect_uri.as_str())])
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<Envelope<T>, ApiError> {
        let response = builder.send().await.map_err(|e| {
            tracing::warn!(error = %e, "auth api request failed");
            ApiError::Network(e.to_string())
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            tracing::warn!(error = %e, %status, "failed to read auth api response");
            ApiError::Network(e.to_string())
        })?;

        match serde_json::from_str::<Envelope<T>>(&body) {
            Ok(envelope) if status.is_success() && envelope.is_success() => Ok(envelope),
            Ok(envelope) => {
                tracing::debug!(%status, server_message = ?envelope.message, "auth api rejected request");
                Err(ApiError::Rejected {
                    status,
                    message: envelope.message,
                })
            }
            Err(e) if status.is_success() => {
                tracing::warn!(error = %e, %status, "failed to parse auth api response");
                Err(ApiError::Decode(e.to_string()))
            }
            Err(_) => {
                tracing::debug!(%status, "auth api returned a non-envelope error");
                Err(ApiError::Rejected {
                    status,
                    message: None,
                })
            }
        }
    }
}

impl AuthApi for ApiClient {
    #[tracing::instrument(skip_all, fields(id = %credentials.id))]
    async fn login(&self, credentials: &Credentials) -> Result<TokenPair, ApiError> {
        let builder = self.request(Method::POST, LOGIN_PATH).json(credentials);
        self.send::<TokenPair>(builder).await?.into_data()
    }

    #[tracing::instrument(skip_all, fields(id = %form.id))]
    async fn signup(&self, form: &SignupForm) -> Result<(), ApiError> {
        let builder = self.request(Method::POST, SIGNUP_PATH).json(form);
        self.send::<IgnoredAny>(builder).await.map(|_| ())
    }

    #[tracing::instrument(skip_all)]
    async fn logout(&self, refresh_token: Option<String>) -> Result<(), ApiError> {
        let builder = self
            .request(Method::POST, LOGOUT_PATH)
            .json(&LogoutRequest { refresh_token });
        self.send::<IgnoredAny>(builder).await.map(|_| ())
    }

    #[tracing::instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let builder = self
            .request(Method::POST, REFRESH_PATH)
            .json(&RefreshRequest { refresh_token });
        self.send::<TokenPair>(builder).await?.into_data()
    }

    #[tracing::instrument(skip_all)]
    async fn validate(&self, access_token: &str) -> bool {
        match self
            .authorized(Method::GET, VALIDATE_PATH, access_token)
            .send()
            .await
        {
            Ok(resp) if resp.status() == StatusCode::OK => true,
            Ok(resp) => {
                tracing::debug!(status = %resp.status(), "token rejected by validate endpoint");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "token validation request failed");
                false
            }
        }
    }

    #[tracing::instrument(skip_all)]
    async fn onboarding_status(
        &self,
        access_token: Option<String>,
    ) -> Result<OnboardingStatus, ApiError> {
        let builder = match access_token.as_deref() {
            Some(token) => self.authorized(Method::GET, ONBOARDING_STATUS_PATH, token),
            None => self.request(Method::GET, ONBOARDING_STATUS_PATH),
        };
        self.send::<OnboardingStatus>(builder).await?.into_data()
    }

    #[tracing::instrument(skip_all, fields(user_id = ?form.user_id))]
    async fn complete_onboarding(
        &self,
        access_token: &str,
        form: &OnboardingForm,
    ) -> Result<(), ApiError> {
        let builder = self
            .authorized(Method::POST, ONBOARDING_COMPLETE_PATH, access_token)
            .json(form);
        self.send::<IgnoredAny>(builder).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_invalid_base_url() {
        let result = ApiClient::new("not a url", Duration::from_secs(1));

        assert!(result.is_err());
    }

    #[test]
    fn test_authorization_url() {
        let client = ApiClient::new("http://api.local:8080/", Duration::from_secs(1)).unwrap();

        let url = client
            .authorization_url(OAuthProvider::Google, "https://app.local/")
            .unwrap();

        assert_eq!(url.path(), "/oauth2/authorization/google");
        let redirect = url
            .query_pairs()
            .find(|(k, _)| k == "redirect_uri")
            .map(|(_, v)| v.into_owned());
        assert_eq!(redirect.as_deref(), Some("https://app.local/oauth2/redirect"));
    }

    #[tokio::test]
    async fn test_login_success_returns_pair() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .and(body_json(json!({"id": "alice", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {"accessToken": "A", "refreshToken": "R"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let pair = client_for(&server)
            .login(&Credentials::new("alice", "pw"))
            .await
            .unwrap();

        assert_eq!(pair, TokenPair::new("A", "R"));
    }

    #[tokio::test]
    async fn test_login_rejection_carries_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "status": "error",
                "message": "Authentication failed"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .login(&Credentials::new("alice", "bad"))
            .await
            .unwrap_err();

        match err {
            ApiError::Rejected { status, message } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(message.as_deref(), Some("Authentication failed"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_success_status_with_error_envelope_is_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SIGNUP_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "error",
                "message": "duplicate id"
            })))
            .mount(&server)
            .await;

        let form = SignupForm {
            id: "alice".to_string(),
            password: "pw".to_string(),
            name: "Alice".to_string(),
            nickname: "ali".to_string(),
            email: "alice@example.com".to_string(),
            gender: "F".to_string(),
            birthday: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            profile_image: None,
        };
        let err = client_for(&server).signup(&form).await.unwrap_err();

        assert!(matches!(err, ApiError::Rejected { message: Some(ref m), .. } if m == "duplicate id"));
    }

    #[tokio::test]
    async fn test_non_envelope_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let err = client_for(&server).refresh("R").await.unwrap_err();

        assert!(matches!(err, ApiError::Rejected { message: None, .. }));
    }

    #[tokio::test]
    async fn test_refresh_sends_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .and(body_json(json!({"refreshToken": "R"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {"accessToken": "A2", "refreshToken": "R2"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let pair = client_for(&server).refresh("R").await.unwrap();

        assert_eq!(pair, TokenPair::new("A2", "R2"));
    }

    #[tokio::test]
    async fn test_validate_sends_bearer_and_accepts_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(VALIDATE_PATH))
            .and(header("Authorization", "Bearer A"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        assert!(client_for(&server).validate("A").await);
    }

    #[tokio::test]
    async fn test_validate_non_200_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(VALIDATE_PATH))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        assert!(!client_for(&server).validate("A").await);
    }

    #[tokio::test]
    async fn test_validate_network_failure_is_invalid() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let client = ApiClient::new(uri, Duration::from_secs(1)).unwrap();

        assert!(!client.validate("A").await);
    }

    #[tokio::test]
    async fn test_logout_without_token_sends_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGOUT_PATH))
            .and(body_json(json!({})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server).logout(None).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_onboarding_status_with_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ONBOARDING_STATUS_PATH))
            .and(header("Authorization", "Bearer A"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {"isNewUser": true, "needsAdditionalInfo": true, "userId": 9}
            })))
            .mount(&server)
            .await;

        let status = client_for(&server)
            .onboarding_status(Some("A".to_string()))
            .await
            .unwrap();

        assert!(status.needs_additional_info);
        assert_eq!(status.user_id, Some(9));
    }

    #[tokio::test]
    async fn test_complete_onboarding_posts_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ONBOARDING_COMPLETE_PATH))
            .and(header("Authorization", "Bearer A"))
            .and(body_json(json!({"userId": 9, "gender": "M", "birthday": "1995-05-05"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
            .expect(1)
            .mount(&server)
            .await;

        let form = OnboardingForm {
            user_id: Some(9),
            nickname: None,
            gender: Some("M".to_string()),
            birthday: NaiveDate::from_ymd_opt(1995, 5, 5),
        };

        let result = client_for(&server).complete_onboarding("A", &form).await;

        assert!(result.is_ok());
    }
}
