//! Common type definitions.
//!
//! # ID Types
//!
//! - [`SubscriptionId`]: Webhook subscription identifier, generated at registration time
//!
//! Subscription IDs are opaque strings of the form `wh_<unix-millis>_<suffix>`, where the suffix is
//! nine random lowercase alphanumerics. They are unique for the lifetime of a process in practice,
//! but carry no meaning beyond that.

use chrono::Utc;
use rand::{Rng, distr::Alphanumeric};

// Type aliases for IDs
pub type SubscriptionId = String;

/// Prefix for generated subscription IDs
pub const SUBSCRIPTION_ID_PREFIX: &str = "wh_";

const SUFFIX_LEN: usize = 9;

/// Generate a fresh subscription ID: registration timestamp plus a random suffix.
pub fn generate_subscription_id() -> SubscriptionId {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();

    format!("{}{}_{}", SUBSCRIPTION_ID_PREFIX, Utc::now().timestamp_millis(), suffix)
}

/// Abbreviate a subscription ID to its random suffix for more readable logs
/// Example: "wh_1760443200000_k3j9x0abq" -> "k3j9x0abq"
pub fn abbrev_id(id: &str) -> &str {
    id.rsplit_once('_').map(|(_, suffix)| suffix).unwrap_or(id)
}
