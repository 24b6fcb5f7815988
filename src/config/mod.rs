use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::usecase::session::SessionSettings;

#[derive(Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_login_redirect_delay_ms")]
    pub login_redirect_delay_ms: u64,
    #[serde(default = "default_token_store_path")]
    pub token_store_path: PathBuf,
    #[serde(default = "default_page_path")]
    pub page_path: String,
    #[serde(default)]
    pub page_query: String,
    #[serde(default = "default_page_origin")]
    pub page_origin: String,
    #[serde(default)]
    pub login_id: Option<String>,
    #[serde(default)]
    pub login_password: Option<String>,
    #[serde(default)]
    pub metrics_listen_addr: Option<String>,
    #[serde(default)]
    pub telemetry_enabled: bool,
    #[serde(default = "default_telemetry_service_name")]
    pub telemetry_service_name: String,
    #[serde(default = "default_telemetry_service_version")]
    pub telemetry_service_version: String,
    #[serde(default = "default_telemetry_environment")]
    pub telemetry_environment: String,
    #[serde(default = "default_telemetry_otlp_endpoint")]
    pub telemetry_otlp_endpoint: String,
}

fn default_api_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_refresh_interval_secs() -> u64 {
    5 * 60
}

fn default_login_redirect_delay_ms() -> u64 {
    1000
}

fn default_token_store_path() -> PathBuf {
    PathBuf::from("session.json")
}

fn default_page_path() -> String {
    "/".to_string()
}

fn default_page_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_telemetry_service_name() -> String {
    "guide-helper-session".to_string()
}

fn default_telemetry_service_version() -> String {
    "1.0.0".to_string()
}

fn default_telemetry_environment() -> String {
    "production".to_string()
}

fn default_telemetry_otlp_endpoint() -> String {
    "http://otel-collector.observability.svc.cluster.local:4317".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_environment(Environment::default())
    }

    fn from_environment(environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(environment)
            .build()?
            .try_deserialize()
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            refresh_interval: Duration::from_secs(self.refresh_interval_secs),
            login_redirect_delay: Duration::from_millis(self.login_redirect_delay_ms),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Page path and query joined into one location, e.g.
    /// `/oauth2/redirect?token=abc`.
    pub fn page_location(&self) -> String {
        let query = self.page_query.trim_start_matches('?');
        if query.is_empty() {
            self.page_path.clone()
        } else {
            format!("{}?{}", self.page_path, query)
        }
    }

    /// Credentials for a non-interactive login, when both are set.
    pub fn login_credentials(&self) -> Option<(&str, &str)> {
        match (self.login_id.as_deref(), self.login_password.as_deref()) {
            (Some(id), Some(password)) if !id.trim().is_empty() => Some((id, password)),
            _ => None,
        }
    }
}
