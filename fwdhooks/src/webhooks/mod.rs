//! Webhook notification system for freight back-office events.
//!
//! - [`registry`]: In-memory subscription registry
//! - [`events`]: Event names and the `{event, timestamp, data}` envelope
//! - [`payloads`]: Internal record to public payload builders
//! - [`signing`]: HMAC-SHA256 `sha256=<hex>` signatures
//! - [`delivery`]: Outbound HTTP request building and sending
//! - [`delivery_log`]: Recent delivery outcomes
//! - [`dispatcher`]: Match/sign/enqueue fan-out and the background sender
//! - [`triggers`]: Typed helpers called when a domain event happens

pub mod delivery;
pub mod delivery_log;
pub mod dispatcher;
pub mod events;
pub mod payloads;
pub mod registry;
pub mod signing;
pub mod triggers;

pub use dispatcher::WebhookDispatcher;
pub use events::{Envelope, WebhookEventType};
pub use registry::{Subscription, SubscriptionConfig, SubscriptionRegistry};
pub use signing::{sign_payload, verify_signature};
pub use triggers::{TriggerError, WebhookTriggers};
