//! API models for domain event ingest.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A domain event reported by the back office.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct EventIngest {
    /// Event name, e.g. `shipment.status_changed`
    pub event: String,
    /// The internal record (camelCase fields) the event is about
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventAccepted {
    pub event: String,
    /// Number of deliveries handed to the sender
    pub scheduled: usize,
}
