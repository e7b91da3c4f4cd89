//! API request and response models for webhook endpoints.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::rust::double_option;
use utoipa::ToSchema;

use crate::types::SubscriptionId;
use crate::webhooks::delivery::DeliveryRecord;
use crate::webhooks::registry::{Subscription, SubscriptionConfig, SubscriptionPatch};

/// Request to register a new webhook.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct WebhookCreate {
    /// http(s) URL to receive webhook events
    pub url: String,
    /// Event names to receive; at least one
    pub events: Vec<String>,
    /// Shared secret for `X-<Product>-Signature`; unsigned when absent or empty
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_active() -> bool {
    true
}

impl From<WebhookCreate> for SubscriptionConfig {
    fn from(request: WebhookCreate) -> Self {
        Self {
            url: request.url,
            events: request.events.into_iter().collect(),
            secret: request.secret,
            active: request.active,
            description: request.description,
        }
    }
}

/// Request to update a webhook. Omitted fields are unchanged; `null` clears `secret` and
/// `description`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct WebhookUpdate {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub events: Option<Vec<String>>,
    #[serde(default, with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub secret: Option<Option<String>>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default, with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
}

impl From<WebhookUpdate> for SubscriptionPatch {
    fn from(request: WebhookUpdate) -> Self {
        Self {
            url: request.url,
            events: request.events.map(|events| events.into_iter().collect()),
            secret: request.secret,
            active: request.active,
            description: request.description,
        }
    }
}

/// A registered webhook. The secret is never returned.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookResponse {
    pub id: SubscriptionId,
    /// Current list position
    pub position: usize,
    pub url: String,
    pub events: BTreeSet<String>,
    pub active: bool,
    pub has_secret: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WebhookResponse {
    pub fn new(subscription: Subscription, position: usize) -> Self {
        Self {
            has_secret: subscription.signing_secret().is_some(),
            id: subscription.id,
            position,
            url: subscription.url,
            events: subscription.events,
            active: subscription.active,
            description: subscription.description,
            created_at: subscription.created_at,
        }
    }
}

/// Response for a test webhook delivery.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookTestResponse {
    /// Whether the test delivery was successful
    pub success: bool,
    /// HTTP status code received (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Error message (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Time taken for the request in milliseconds
    pub duration_ms: u64,
}

impl From<DeliveryRecord> for WebhookTestResponse {
    fn from(record: DeliveryRecord) -> Self {
        Self {
            success: record.success,
            status_code: record.status_code,
            error: record.error,
            duration_ms: record.duration_ms,
        }
    }
}

/// A recognized event name.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventTypeInfo {
    pub name: String,
    pub description: String,
}

/// Path parameters for webhook endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPathParams {
    pub id: SubscriptionId,
}

/// Path parameters for the positional endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionPathParams {
    pub index: usize,
}
