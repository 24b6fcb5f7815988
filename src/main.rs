use std::net::SocketAddr;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

use guide_session::config::AppConfig;
use guide_session::delivery::console::ConsolePage;
use guide_session::domain::route::{OAuthProvider, Route};
use guide_session::domain::session::CheckOutcome;
use guide_session::repository::api::ApiClient;
use guide_session::repository::store::FileTokenStore;
use guide_session::telemetry;
use guide_session::usecase::contracts::Page;
use guide_session::usecase::session::SessionManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("failed to load config")?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let provider = if config.telemetry_enabled {
        let telemetry_config = telemetry::TelemetryConfig::from(&config);
        let provider = telemetry::init_telemetry_with_subscriber(&telemetry_config, env_filter)
            .map_err(|e| anyhow::anyhow!("failed to initialize telemetry: {e}"))?;
        Some(provider)
    } else {
        telemetry::init_subscriber_without_telemetry(env_filter);
        None
    };
    tracing::info!("starting the session client");

    if let Some(addr) = config.metrics_listen_addr.as_deref() {
        let addr: SocketAddr = addr
            .parse()
            .with_context(|| format!("invalid metrics listen address {addr}"))?;
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to install Prometheus exporter")?;
        tracing::info!(%addr, "prometheus metrics initialized");
    }

    let store = FileTokenStore::open(&config.token_store_path)?;
    let api = ApiClient::new(config.api_base_url.clone(), config.http_timeout())?;
    let page = ConsolePage::new(&config.page_location());
    let manager = SessionManager::new(store, api.clone(), page, config.session_settings());

    if Route::OAuthRedirect.matches(&manager.page().current_path()) {
        if let Err(e) = manager.handle_oauth_redirect() {
            tracing::warn!(error = %e, "oauth redirect not completed");
        }
    }

    let outcome = manager.restore().await;
    tracing::info!(?outcome, state = %manager.state(), "session restored");

    if outcome != CheckOutcome::Valid {
        match config.login_credentials() {
            Some((id, password)) => {
                if let Err(e) = manager.login(id, password).await {
                    tracing::warn!(error = %e, "login failed");
                }
            }
            None => {
                for provider in [OAuthProvider::Google, OAuthProvider::Naver] {
                    let url = api.authorization_url(provider, &config.page_origin)?;
                    tracing::info!(provider = provider.as_str(), %url, "sign in via provider");
                }
            }
        }
    }

    manager.check_onboarding().await;

    manager
        .run_keepalive(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await;

    tracing::info!(state = %manager.state(), "session client stopped");
    telemetry::shutdown_telemetry(provider);

    Ok(())
}
