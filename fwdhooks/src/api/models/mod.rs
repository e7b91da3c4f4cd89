//! Request and response data structures for the HTTP API.
//!
//! - [`webhooks`]: Subscription management and delivery log
//! - [`events`]: Domain event ingest

pub mod events;
pub mod webhooks;
