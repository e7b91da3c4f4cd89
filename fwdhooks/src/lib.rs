//! # fwdhooks: webhook notifications for the freight back office
//!
//! `fwdhooks` tells external systems (ERPs, customer portals, ops tooling) when something
//! happens to a shipment, booking, invoice, conversation or support ticket. Subscribers register
//! an endpoint URL and the event names they care about; when the back office reports a domain
//! event, every active matching subscriber receives a signed JSON `POST`.
//!
//! ## Flow
//!
//! ```text
//! POST /api/v1/events ─▶ WebhookTriggers ─▶ payload builder ─▶ WebhookDispatcher::dispatch
//!                                                               ├─ SubscriptionRegistry::matching
//!                                                               ├─ Envelope {event, timestamp, data}
//!                                                               ├─ sign (when a secret is set)
//!                                                               └─ enqueue ─▶ sender task ─▶ HTTP POST
//! ```
//!
//! Delivery is fire-and-forget: callers learn how many deliveries were scheduled, never whether
//! they succeeded. Outcomes are logged, counted and kept in a short in-memory delivery log.
//! Subscriptions live in memory only; seeds from the config file are registered at startup.
//!
//! ## Modules
//!
//! - [`webhooks`]: registry, envelope, payload builders, signer, transport, dispatcher, triggers
//! - [`api`]: management and ingest HTTP handlers
//! - [`config`]: YAML + environment configuration
//! - [`telemetry`]: tracing and optional OTLP export
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use fwdhooks::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = fwdhooks::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     fwdhooks::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! }
//! ```

pub mod api;
mod auth;
pub mod config;
pub mod errors;
mod metrics;
mod openapi;
pub mod telemetry;
pub mod types;
pub mod webhooks;

#[cfg(test)]
mod test_utils;

use axum::{
    Json, Router,
    http::{self, HeaderValue},
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};
use bon::Builder;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;
use config::CorsOrigin;
use openapi::ApiDoc;
use webhooks::{SubscriptionRegistry, WebhookDispatcher, WebhookTriggers};

/// Shared state handed to every handler.
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .dispatcher(dispatcher.clone())
///     .triggers(WebhookTriggers::new(dispatcher))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub dispatcher: WebhookDispatcher,
    pub triggers: WebhookTriggers,
    pub metrics_handle: Option<PrometheusHandle>,
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::PATCH, http::Method::DELETE])
        .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router: management API, docs, health, and optional metrics.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        .route(
            "/webhooks",
            get(api::handlers::webhooks::list_webhooks).post(api::handlers::webhooks::create_webhook),
        )
        .route("/webhooks/event-types", get(api::handlers::webhooks::list_event_types))
        .route("/webhooks/deliveries", get(api::handlers::webhooks::list_deliveries))
        .route(
            "/webhooks/positions/{index}",
            delete(api::handlers::webhooks::delete_webhook_at_position),
        )
        .route(
            "/webhooks/{id}",
            get(api::handlers::webhooks::get_webhook)
                .patch(api::handlers::webhooks::update_webhook)
                .delete(api::handlers::webhooks::delete_webhook),
        )
        .route("/webhooks/{id}/test", post(api::handlers::webhooks::test_webhook))
        .route("/events", post(api::handlers::events::ingest_event))
        .route_layer(from_fn_with_state(state.clone(), auth::require_api_token))
        .with_state(state.clone());

    let mut router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    if let Some(handle) = state.metrics_handle.clone() {
        router = router.route("/internal/metrics", get(move || async move { handle.render() }));
    }

    let router = router.layer(create_cors_layer(&state.config)?).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::DEBUG))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Background tasks running alongside the HTTP server.
///
/// Dropping this cancels the shutdown token through `drop_guard`, which stops the webhook sender.
pub struct BackgroundServices {
    shutdown_token: tokio_util::sync::CancellationToken,
    webhook_sender: Option<JoinHandle<()>>,
    // Pub so that we can disarm it if we want to
    pub drop_guard: Option<tokio_util::sync::DropGuard>,
}

impl BackgroundServices {
    fn new() -> Self {
        let shutdown_token = tokio_util::sync::CancellationToken::new();
        let drop_guard = Some(shutdown_token.clone().drop_guard());
        Self {
            shutdown_token,
            webhook_sender: None,
            drop_guard,
        }
    }

    /// Stop background tasks and wait for the webhook sender to finish its remaining deliveries.
    pub async fn shutdown(self) {
        self.shutdown_token.cancel();

        if let Some(sender) = self.webhook_sender
            && let Err(e) = sender.await
        {
            tracing::error!("Webhook sender task failed: {}", e);
        }
    }
}

/// Register the subscriptions declared in the config file.
fn seed_subscriptions(registry: &SubscriptionRegistry, config: &Config) {
    for seed in &config.webhooks.subscriptions {
        let id = registry.register(seed.into());
        info!(subscription_id = %id, url = %seed.url, "Registered webhook subscription from config");
    }
}

/// Main application: router plus the background services it depends on.
///
/// 1. **Create**: [`Application::new`] builds the registry, seeds it, and starts the sender task
/// 2. **Serve**: [`Application::serve`] binds to the configured address and handles requests
/// 3. **Shutdown**: when the shutdown future resolves, in-flight requests finish, then the sender
///    sends what is still queued and waits for in-flight deliveries within the grace period
pub struct Application {
    router: Router,
    config: Config,
    bg_services: BackgroundServices,
}

impl Application {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting fwdhooks with configuration: {:#?}", config);

        let mut bg_services = BackgroundServices::new();

        let registry = Arc::new(SubscriptionRegistry::new());
        seed_subscriptions(&registry, &config);

        let (dispatcher, webhook_sender) = WebhookDispatcher::spawn(
            registry,
            &config.webhooks,
            &config.product_name,
            bg_services.shutdown_token.clone(),
        )?;
        bg_services.webhook_sender = Some(webhook_sender);

        let metrics_handle = config.enable_metrics.then(metrics::get_or_install_prometheus_handle);

        let app_state = AppState::builder()
            .config(config.clone())
            .triggers(WebhookTriggers::new(dispatcher.clone()))
            .dispatcher(dispatcher)
            .maybe_metrics_handle(metrics_handle)
            .build();

        let router = build_router(&app_state)?;

        Ok(Self {
            router,
            config,
            bg_services,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> (axum_test::TestServer, BackgroundServices) {
        let server = axum_test::TestServer::new(self.router).expect("Failed to create test server");
        (server, self.bg_services)
    }

    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "fwdhooks listening on http://{}, docs at http://localhost:{}/docs",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Stopping webhook sender...");
        self.bg_services.shutdown().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::config::{Config, SubscriptionSeed};
    use crate::test_utils::{create_test_app, create_test_app_with_config};

    #[test_log::test(tokio::test)]
    async fn test_health_and_docs() {
        let (server, _bg_services) = create_test_app().await;

        let health = server.get("/healthz").await;
        health.assert_status_ok();
        assert_eq!(health.text(), "OK");

        let doc = server.get("/openapi.json").await;
        doc.assert_status_ok();
        assert!(doc.text().contains("\"openapi\""));

        server.get("/docs").await.assert_status_ok();
    }

    #[test_log::test(tokio::test)]
    async fn test_seed_subscriptions_registered() {
        let mut config = Config::default();
        config.webhooks.subscriptions = vec![SubscriptionSeed {
            url: "https://erp.example.com/hooks".to_string(),
            events: vec!["invoice.paid".to_string()],
            secret: Some("s3cr3t".to_string()),
            active: true,
            description: Some("ERP".to_string()),
        }];
        let (server, _bg_services) = create_test_app_with_config(config).await;

        let list: Vec<serde_json::Value> = server.get("/api/v1/webhooks").await.json();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["url"], "https://erp.example.com/hooks");
        assert_eq!(list[0]["has_secret"], true);
    }

    #[test_log::test(tokio::test)]
    async fn test_background_shutdown_waits_for_deliveries() {
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_delay(std::time::Duration::from_millis(50)))
            .expect(3)
            .mount(&mock_server)
            .await;

        let mut config = Config::default();
        config.webhooks.max_concurrent_sends = 1;
        config.webhooks.subscriptions = (0..3)
            .map(|_| SubscriptionSeed {
                url: mock_server.uri(),
                events: vec!["booking.confirmed".to_string()],
                secret: None,
                active: true,
                description: None,
            })
            .collect();
        let (server, bg_services) = create_test_app_with_config(config).await;

        let accepted: serde_json::Value = server
            .post("/api/v1/events")
            .json(&serde_json::json!({"event": "booking.confirmed", "data": {"bookingNo": "BK-1"}}))
            .await
            .json();
        assert_eq!(accepted["scheduled"], 3);

        bg_services.shutdown().await;
        assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);

        let deliveries: Vec<serde_json::Value> = server.get("/api/v1/webhooks/deliveries").await.json();
        assert_eq!(deliveries.len(), 3);
    }

    #[test_log::test(tokio::test)]
    async fn test_metrics_endpoint() {
        let (server, _bg_services) = create_test_app().await;
        server.get("/internal/metrics").await.assert_status_ok();

        let mut config = Config::default();
        config.enable_metrics = false;
        let (server, _bg_services) = create_test_app_with_config(config).await;
        server.get("/internal/metrics").await.assert_status_not_found();
    }
}
