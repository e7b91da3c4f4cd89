//! Delivery transport: turn an envelope into a signed HTTP request and POST it.
//!
//! A delivery is one or more attempts against a single subscriber. Success means a 2xx response;
//! anything else, including transport errors and timeouts, is a failure. With the default retry
//! config exactly one attempt is made and failures are only reported, never queued.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use utoipa::ToSchema;

use crate::config::RetryConfig;
use crate::types::SubscriptionId;
use crate::webhooks::events::Envelope;
use crate::webhooks::registry::Subscription;
use crate::webhooks::signing::{self, SigningError};

/// Header names derived from the configured product name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderNames {
    pub event: String,
    pub timestamp: String,
    pub signature: String,
    pub user_agent: String,
}

impl HeaderNames {
    pub fn for_product(product: &str) -> Self {
        Self {
            event: format!("X-{}-Event", product),
            timestamp: format!("X-{}-Timestamp", product),
            signature: format!("X-{}-Signature", product),
            user_agent: format!("{}-Webhooks/1.0", product),
        }
    }
}

/// Check that `url` is an absolute http(s) URL a delivery can be sent to.
pub fn validate_endpoint_url(url: &str, require_https: bool) -> Result<(), String> {
    let parsed = Url::parse(url).map_err(|e| format!("Invalid webhook URL '{}': {}", url, e))?;

    match parsed.scheme() {
        "https" => Ok(()),
        "http" if !require_https => Ok(()),
        "http" => Err("Webhook URL must use HTTPS".to_string()),
        other => Err(format!("Unsupported webhook URL scheme: {}", other)),
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to serialize envelope: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to sign envelope: {0}")]
    Signing(#[from] SigningError),
}

/// A pre-built webhook HTTP request ready to send. Carries no secrets.
#[derive(Debug, Clone)]
pub struct WebhookSendRequest {
    pub subscription_id: SubscriptionId,
    pub url: String,
    pub event: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl WebhookSendRequest {
    /// Address `body` (the serialized `envelope`) to one subscriber, signing the exact body bytes
    /// when the subscription has a secret.
    pub fn build(subscription: &Subscription, envelope: &Envelope, body: &str, names: &HeaderNames) -> Result<Self, SigningError> {
        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), names.user_agent.clone()),
            (names.event.clone(), envelope.event.clone()),
            (names.timestamp.clone(), envelope.timestamp.clone()),
        ];

        if let Some(secret) = subscription.signing_secret() {
            let signature = signing::sign_payload(body, secret)?;
            headers.push((names.signature.clone(), signature));
        }

        Ok(Self {
            subscription_id: subscription.id.clone(),
            url: subscription.url.clone(),
            event: envelope.event.clone(),
            headers,
            body: body.to_string(),
        })
    }
}

/// Outcome of a single HTTP attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Success { status_code: u16 },
    Failure { status_code: Option<u16>, error: String },
}

impl SendOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Final result of a delivery, after all attempts.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeliveryRecord {
    pub subscription_id: SubscriptionId,
    pub url: String,
    pub event: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempts: u32,
    pub duration_ms: u64,
    pub completed_at: DateTime<Utc>,
}

/// Perform exactly one POST.
pub async fn send_once(client: &reqwest::Client, request: &WebhookSendRequest) -> SendOutcome {
    let mut req_builder = client.post(&request.url);
    for (name, value) in &request.headers {
        req_builder = req_builder.header(name, value);
    }
    req_builder = req_builder.body(request.body.clone());

    match req_builder.send().await {
        Ok(response) => {
            let status_code = response.status().as_u16();
            if response.status().is_success() {
                SendOutcome::Success { status_code }
            } else {
                SendOutcome::Failure {
                    status_code: Some(status_code),
                    error: format!("HTTP {}", status_code),
                }
            }
        }
        Err(e) if e.is_timeout() => SendOutcome::Failure {
            status_code: None,
            error: format!("request timed out: {}", e),
        },
        Err(e) => SendOutcome::Failure {
            status_code: None,
            error: e.to_string(),
        },
    }
}

/// Deliver a request, retrying failures up to `retry.max_attempts` in total.
pub async fn deliver(client: &reqwest::Client, request: &WebhookSendRequest, retry: &RetryConfig) -> DeliveryRecord {
    let start = Instant::now();
    let max_attempts = retry.max_attempts.max(1);
    let mut attempts = 0;

    let outcome = loop {
        attempts += 1;
        tracing::debug!(
            subscription_id = %request.subscription_id,
            url = %request.url,
            event = %request.event,
            attempt = attempts,
            "Sending webhook HTTP request"
        );

        let outcome = send_once(client, request).await;
        if outcome.is_success() || attempts >= max_attempts {
            break outcome;
        }

        let delay = backoff_delay(retry, attempts);
        tracing::debug!(
            subscription_id = %request.subscription_id,
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            "Webhook attempt failed, retrying"
        );
        tokio::time::sleep(delay).await;
    };

    let (success, status_code, error) = match outcome {
        SendOutcome::Success { status_code } => (true, Some(status_code), None),
        SendOutcome::Failure { status_code, error } => (false, status_code, Some(error)),
    };

    DeliveryRecord {
        subscription_id: request.subscription_id.clone(),
        url: request.url.clone(),
        event: request.event.clone(),
        success,
        status_code,
        error,
        attempts,
        duration_ms: start.elapsed().as_millis() as u64,
        completed_at: Utc::now(),
    }
}

/// Delay after the `attempt`-th failure: exponential from `initial_backoff`, capped at
/// `max_backoff`, optionally jittered into `[d/2, d]`.
pub fn backoff_delay(retry: &RetryConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let base = retry.initial_backoff.saturating_mul(1 << exponent).min(retry.max_backoff);

    if !retry.jitter {
        return base;
    }

    let full = base.as_millis() as u64;
    if full == 0 {
        return base;
    }
    Duration::from_millis(rand::rng().random_range(full / 2..=full))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhooks::events::WebhookEventType;
    use std::collections::BTreeSet;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn subscription(url: &str, secret: Option<&str>) -> Subscription {
        Subscription {
            id: "wh_1_test".to_string(),
            url: url.to_string(),
            events: BTreeSet::from(["shipment.created".to_string()]),
            secret: secret.map(str::to_string),
            active: true,
            description: None,
            created_at: Utc::now(),
        }
    }

    fn build(sub: &Subscription, envelope: &Envelope, names: &HeaderNames) -> WebhookSendRequest {
        let body = envelope.to_json().unwrap();
        WebhookSendRequest::build(sub, envelope, &body, names).unwrap()
    }

    fn header_value<'a>(request: &'a WebhookSendRequest, name: &str) -> Option<&'a str> {
        request.headers.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    fn no_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_header_names() {
        let names = HeaderNames::for_product("Freightdesk");
        assert_eq!(names.event, "X-Freightdesk-Event");
        assert_eq!(names.timestamp, "X-Freightdesk-Timestamp");
        assert_eq!(names.signature, "X-Freightdesk-Signature");
        assert_eq!(names.user_agent, "Freightdesk-Webhooks/1.0");
    }

    #[test]
    fn test_build_signed_request() {
        let names = HeaderNames::for_product("Freightdesk");
        let envelope = Envelope::new(WebhookEventType::ShipmentCreated, serde_json::json!({"shipment_no": "X1"}));
        let request = build(&subscription("https://example.com/hook", Some("s3cr3t")), &envelope, &names);

        assert_eq!(header_value(&request, "Content-Type"), Some("application/json"));
        assert_eq!(header_value(&request, "X-Freightdesk-Event"), Some("shipment.created"));
        assert_eq!(header_value(&request, "X-Freightdesk-Timestamp"), Some(envelope.timestamp.as_str()));

        let signature = header_value(&request, "X-Freightdesk-Signature").unwrap();
        assert!(signing::verify_signature(&request.body, signature, "s3cr3t"));
    }

    #[test]
    fn test_build_unsigned_request_without_secret() {
        let names = HeaderNames::for_product("Freightdesk");
        let envelope = Envelope::new(WebhookEventType::ShipmentCreated, serde_json::json!({}));

        let request = build(&subscription("https://example.com/hook", None), &envelope, &names);
        assert!(header_value(&request, "X-Freightdesk-Signature").is_none());

        let request = build(&subscription("https://example.com/hook", Some("")), &envelope, &names);
        assert!(header_value(&request, "X-Freightdesk-Signature").is_none());
    }

    #[test]
    fn test_backoff_without_jitter() {
        let retry = RetryConfig {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
            jitter: false,
        };
        assert_eq!(backoff_delay(&retry, 1), Duration::from_millis(100));
        assert_eq!(backoff_delay(&retry, 2), Duration::from_millis(200));
        assert_eq!(backoff_delay(&retry, 3), Duration::from_millis(350));
        assert_eq!(backoff_delay(&retry, 30), Duration::from_millis(350));
    }

    #[test]
    fn test_backoff_jitter_bounds() {
        let retry = RetryConfig {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(400),
            max_backoff: Duration::from_secs(10),
            jitter: true,
        };
        for _ in 0..50 {
            let delay = backoff_delay(&retry, 1);
            assert!(delay >= Duration::from_millis(200) && delay <= Duration::from_millis(400));
        }
    }

    #[tokio::test]
    async fn test_send_once_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("Content-Type", "application/json"))
            .and(header("User-Agent", "Freightdesk-Webhooks/1.0"))
            .and(header_exists("X-Freightdesk-Signature"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let names = HeaderNames::for_product("Freightdesk");
        let envelope = Envelope::new(WebhookEventType::ShipmentCreated, serde_json::json!({}));
        let url = format!("{}/hook", mock_server.uri());
        let request = build(&subscription(&url, Some("s3cr3t")), &envelope, &names);

        let outcome = send_once(&crate::test_utils::test_http_client(), &request).await;
        assert_eq!(outcome, SendOutcome::Success { status_code: 204 });
    }

    #[tokio::test]
    async fn test_non_2xx_is_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let names = HeaderNames::for_product("Freightdesk");
        let envelope = Envelope::new(WebhookEventType::ShipmentCreated, serde_json::json!({}));
        let request = build(&subscription(&mock_server.uri(), None), &envelope, &names);

        let record = deliver(&crate::test_utils::test_http_client(), &request, &no_retry()).await;
        assert!(!record.success);
        assert_eq!(record.status_code, Some(500));
        assert_eq!(record.error.as_deref(), Some("HTTP 500"));
        assert_eq!(record.attempts, 1);
    }

    #[tokio::test]
    async fn test_network_error_is_failure() {
        let names = HeaderNames::for_product("Freightdesk");
        let envelope = Envelope::new(WebhookEventType::ShipmentCreated, serde_json::json!({}));
        // Point to a port that's not listening
        let request = build(&subscription("http://127.0.0.1:1", None), &envelope, &names);

        let record = deliver(&crate::test_utils::test_http_client(), &request, &no_retry()).await;
        assert!(!record.success);
        assert_eq!(record.status_code, None);
        assert!(record.error.is_some());
    }

    #[tokio::test]
    async fn test_retry_stops_at_max_attempts() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&mock_server)
            .await;

        let retry = RetryConfig {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            jitter: false,
        };
        let names = HeaderNames::for_product("Freightdesk");
        let envelope = Envelope::new(WebhookEventType::ShipmentCreated, serde_json::json!({}));
        let request = build(&subscription(&mock_server.uri(), None), &envelope, &names);

        let record = deliver(&crate::test_utils::test_http_client(), &request, &retry).await;
        assert!(!record.success);
        assert_eq!(record.attempts, 3);
    }

    #[tokio::test]
    async fn test_retry_stops_after_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let retry = RetryConfig {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            jitter: true,
        };
        let names = HeaderNames::for_product("Freightdesk");
        let envelope = Envelope::new(WebhookEventType::ShipmentCreated, serde_json::json!({}));
        let request = build(&subscription(&mock_server.uri(), None), &envelope, &names);

        let record = deliver(&crate::test_utils::test_http_client(), &request, &retry).await;
        assert!(record.success);
        assert_eq!(record.status_code, Some(200));
        assert_eq!(record.attempts, 2);
    }
}
