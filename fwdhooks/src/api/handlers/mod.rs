//! HTTP request handlers for all API endpoints.
//!
//! Handlers validate input, act on the shared [`crate::AppState`], and return
//! [`crate::errors::Error`], which converts to a status code and a JSON `{"message": ...}` body.
//!
//! # Handler Modules
//!
//! - [`webhooks`]: Subscription CRUD, test sends, the delivery log and event type listing
//! - [`events`]: Domain event ingest

pub mod events;
pub mod webhooks;
