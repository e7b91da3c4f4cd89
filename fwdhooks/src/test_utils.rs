//! Test utilities for API and delivery tests
use axum_test::TestServer;

use crate::config::Config;

/// Outbound clients need a process-wide rustls provider; main installs it for the binary.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

pub fn test_http_client() -> reqwest::Client {
    install_crypto_provider();
    reqwest::Client::new()
}

pub async fn create_test_app() -> (TestServer, crate::BackgroundServices) {
    create_test_app_with_config(Config::default()).await
}

pub async fn create_test_app_with_config(config: Config) -> (TestServer, crate::BackgroundServices) {
    install_crypto_provider();
    let app = crate::Application::new(config).await.expect("Failed to create application");
    app.into_test_server()
}
