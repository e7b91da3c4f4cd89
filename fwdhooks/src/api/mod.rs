//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Webhooks** (`/api/v1/webhooks/*`): Register, list, edit, delete and test subscriptions;
//!   recent deliveries; recognized event types
//! - **Events** (`/api/v1/events`): Report a domain event for delivery
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with `utoipa`. The OpenAPI document is served at `/openapi.json` and rendered
//! at `/docs`.

pub mod handlers;
pub mod models;
