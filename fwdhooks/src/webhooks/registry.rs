//! In-memory subscription registry.
//!
//! Records live for the lifetime of the process in insertion order. Each record carries the id
//! generated at registration, so callers can address it either by id or by list position. The
//! positional operations keep their historical semantics: an index outside `[0, len)` is an error
//! and leaves the registry untouched.
//!
//! The registry does not validate what it stores. URL and event-name checks belong to the caller
//! (see the API handlers).

use std::collections::BTreeSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{SubscriptionId, generate_subscription_id};

/// What a caller supplies when registering or replacing an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionConfig {
    pub url: String,
    pub events: BTreeSet<String>,
    pub secret: Option<String>,
    pub active: bool,
    pub description: Option<String>,
}

/// A registered webhook endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub url: String,
    pub events: BTreeSet<String>,
    pub secret: Option<String>,
    pub active: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Check if this subscription should receive the given event.
    pub fn accepts_event(&self, event: &str) -> bool {
        self.active && self.events.contains(event)
    }

    /// The secret to sign with, if one is configured and non-empty.
    pub fn signing_secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|s| !s.is_empty())
    }
}

/// Partial update applied by id. `None` leaves a field unchanged; the nested options on
/// `secret` and `description` allow clearing them.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionPatch {
    pub url: Option<String>,
    pub events: Option<BTreeSet<String>>,
    pub secret: Option<Option<String>>,
    pub active: Option<bool>,
    pub description: Option<Option<String>>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("index {index} is out of range for {len} subscriptions")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("subscription {0} not found")]
    NotFound(SubscriptionId),
}

#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: RwLock<Vec<Subscription>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-written Vec behind, so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, Vec<Subscription>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Subscription>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a copy of `config` and return its freshly generated id.
    pub fn register(&self, config: SubscriptionConfig) -> SubscriptionId {
        let id = generate_subscription_id();
        let subscription = Subscription {
            id: id.clone(),
            url: config.url,
            events: config.events,
            secret: config.secret,
            active: config.active,
            description: config.description,
            created_at: Utc::now(),
        };

        self.write().push(subscription);
        tracing::debug!(subscription_id = %id, "Registered webhook subscription");
        id
    }

    /// Snapshot of all subscriptions in insertion order.
    pub fn list(&self) -> Vec<Subscription> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn get(&self, id: &str) -> Option<Subscription> {
        self.read().iter().find(|s| s.id == id).cloned()
    }

    /// Current list position of a subscription.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.read().iter().position(|s| s.id == id)
    }

    /// Active subscriptions that listen for `event`, in insertion order.
    pub fn matching(&self, event: &str) -> Vec<Subscription> {
        self.read().iter().filter(|s| s.accepts_event(event)).cloned().collect()
    }

    /// Remove the record at `index`.
    pub fn remove(&self, index: usize) -> Result<Subscription, RegistryError> {
        let mut entries = self.write();
        let len = entries.len();
        if index >= len {
            return Err(RegistryError::IndexOutOfRange { index, len });
        }
        Ok(entries.remove(index))
    }

    /// Replace the editable fields of the record at `index`. Id and creation time are kept.
    pub fn update(&self, index: usize, config: SubscriptionConfig) -> Result<Subscription, RegistryError> {
        let mut entries = self.write();
        let len = entries.len();
        let entry = entries.get_mut(index).ok_or(RegistryError::IndexOutOfRange { index, len })?;

        entry.url = config.url;
        entry.events = config.events;
        entry.secret = config.secret;
        entry.active = config.active;
        entry.description = config.description;
        Ok(entry.clone())
    }

    pub fn update_by_id(&self, id: &str, patch: SubscriptionPatch) -> Result<Subscription, RegistryError> {
        let mut entries = self.write();
        let entry = entries
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        if let Some(url) = patch.url {
            entry.url = url;
        }
        if let Some(events) = patch.events {
            entry.events = events;
        }
        if let Some(secret) = patch.secret {
            entry.secret = secret;
        }
        if let Some(active) = patch.active {
            entry.active = active;
        }
        if let Some(description) = patch.description {
            entry.description = description;
        }
        Ok(entry.clone())
    }

    pub fn remove_by_id(&self, id: &str) -> Result<Subscription, RegistryError> {
        let mut entries = self.write();
        let index = entries
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        Ok(entries.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str, events: &[&str], active: bool) -> SubscriptionConfig {
        SubscriptionConfig {
            url: url.to_string(),
            events: events.iter().map(|e| e.to_string()).collect(),
            secret: None,
            active,
            description: None,
        }
    }

    #[test]
    fn test_register_and_list_in_order() {
        let registry = SubscriptionRegistry::new();
        let a = registry.register(config("https://a.example/hook", &["shipment.created"], true));
        let b = registry.register(config("https://b.example/hook", &["invoice.paid"], true));

        let list = registry.list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, a);
        assert_eq!(list[0].url, "https://a.example/hook");
        assert_eq!(list[1].id, b);
        assert_ne!(a, b);
    }

    #[test]
    fn test_list_is_a_snapshot() {
        let registry = SubscriptionRegistry::new();
        registry.register(config("https://a.example/hook", &["shipment.created"], true));

        let mut snapshot = registry.list();
        snapshot[0].url = "https://changed.example".to_string();
        snapshot.clear();

        assert_eq!(registry.list()[0].url, "https://a.example/hook");
    }

    #[test]
    fn test_registered_id_addresses_record() {
        let registry = SubscriptionRegistry::new();
        registry.register(config("https://a.example/hook", &["shipment.created"], true));
        let id = registry.register(config("https://b.example/hook", &["shipment.created"], true));

        assert_eq!(registry.get(&id).unwrap().url, "https://b.example/hook");
        assert_eq!(registry.position(&id), Some(1));
    }

    #[test]
    fn test_matching_requires_active_and_event() {
        let registry = SubscriptionRegistry::new();
        let wanted = registry.register(config("https://a.example", &["shipment.created", "invoice.paid"], true));
        registry.register(config("https://b.example", &["shipment.created"], false));
        registry.register(config("https://c.example", &["invoice.paid"], true));

        let matches = registry.matching("shipment.created");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, wanted);

        assert_eq!(registry.matching("invoice.paid").len(), 2);
        assert!(registry.matching("ticket.created").is_empty());
    }

    #[test]
    fn test_remove_by_index() {
        let registry = SubscriptionRegistry::new();
        registry.register(config("https://a.example", &["shipment.created"], true));
        registry.register(config("https://b.example", &["shipment.created"], true));

        let removed = registry.remove(0).unwrap();
        assert_eq!(removed.url, "https://a.example");
        assert_eq!(registry.list().len(), 1);
        assert_eq!(registry.list()[0].url, "https://b.example");
    }

    #[test]
    fn test_remove_on_empty_registry() {
        let registry = SubscriptionRegistry::new();
        assert_eq!(registry.remove(0), Err(RegistryError::IndexOutOfRange { index: 0, len: 0 }));
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_remove_out_of_range_keeps_records() {
        let registry = SubscriptionRegistry::new();
        registry.register(config("https://a.example", &["shipment.created"], true));

        assert_eq!(registry.remove(1), Err(RegistryError::IndexOutOfRange { index: 1, len: 1 }));
        assert_eq!(registry.remove(usize::MAX), Err(RegistryError::IndexOutOfRange { index: usize::MAX, len: 1 }));

        let list = registry.list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].url, "https://a.example");
    }

    #[test]
    fn test_update_by_index_keeps_identity() {
        let registry = SubscriptionRegistry::new();
        let id = registry.register(config("https://a.example", &["shipment.created"], true));
        let created_at = registry.get(&id).unwrap().created_at;

        let updated = registry.update(0, config("https://new.example", &["booking.created"], false)).unwrap();
        assert_eq!(updated.id, id);
        assert_eq!(updated.created_at, created_at);
        assert_eq!(updated.url, "https://new.example");
        assert!(!updated.active);

        assert!(matches!(
            registry.update(3, config("https://x.example", &[], true)),
            Err(RegistryError::IndexOutOfRange { index: 3, len: 1 })
        ));
    }

    #[test]
    fn test_patch_by_id() {
        let registry = SubscriptionRegistry::new();
        let mut with_secret = config("https://a.example", &["shipment.created"], true);
        with_secret.secret = Some("s3cr3t".to_string());
        let id = registry.register(with_secret);

        let patched = registry
            .update_by_id(
                &id,
                SubscriptionPatch {
                    active: Some(false),
                    secret: Some(None),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(!patched.active);
        assert_eq!(patched.secret, None);
        assert_eq!(patched.url, "https://a.example");

        assert_eq!(
            registry.update_by_id("wh_missing", SubscriptionPatch::default()),
            Err(RegistryError::NotFound("wh_missing".to_string()))
        );
    }

    #[test]
    fn test_remove_by_id() {
        let registry = SubscriptionRegistry::new();
        let a = registry.register(config("https://a.example", &["shipment.created"], true));
        let b = registry.register(config("https://b.example", &["shipment.created"], true));

        registry.remove_by_id(&a).unwrap();
        assert_eq!(registry.position(&b), Some(0));
        assert!(registry.remove_by_id(&a).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_secret_is_not_a_signing_secret() {
        let registry = SubscriptionRegistry::new();
        let mut cfg = config("https://a.example", &["shipment.created"], true);
        cfg.secret = Some(String::new());
        let id = registry.register(cfg);

        assert_eq!(registry.get(&id).unwrap().signing_secret(), None);
    }
}
