//! In-process publish/subscribe.
//!
//! An [`Event`] is an opaque type tag plus an opaque payload. Producers hold an
//! `Arc<EventBus>` and publish; consumers subscribe closures and keep the
//! returned [`SubscriptionId`] if they ever want to leave.

pub mod bus;

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

pub use bus::{EventBus, Handler, SubscriptionId};

// ─── Event type ──────────────────────────────────────────────────

/// Opaque event category, e.g. `"http.request_complete"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventType(Cow<'static, str>);

impl EventType {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for EventType {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

// ─── Catalogue ───────────────────────────────────────────────────

pub const USER_CREATED: EventType = EventType::from_static("user.created");
pub const USER_UPDATED: EventType = EventType::from_static("user.updated");
pub const USER_DELETED: EventType = EventType::from_static("user.deleted");
pub const USER_LOGGED_IN: EventType = EventType::from_static("user.logged_in");
pub const USER_LOGGED_OUT: EventType = EventType::from_static("user.logged_out");

pub const PRODUCT_CREATED: EventType = EventType::from_static("product.created");
pub const PRODUCT_UPDATED: EventType = EventType::from_static("product.updated");
pub const PRODUCT_DELETED: EventType = EventType::from_static("product.deleted");
pub const STOCK_UPDATED: EventType = EventType::from_static("product.stock_updated");

pub const SYSTEM_STARTED: EventType = EventType::from_static("system.started");
pub const SYSTEM_SHUTDOWN: EventType = EventType::from_static("system.shutdown");
pub const CONFIG_RELOADED: EventType = EventType::from_static("system.config_reloaded");
pub const DATABASE_ERROR: EventType = EventType::from_static("system.database_error");
pub const CACHE_ERROR: EventType = EventType::from_static("system.cache_error");
pub const SECURITY_ALERT: EventType = EventType::from_static("system.security_alert");
pub const BACKUP_COMPLETE: EventType = EventType::from_static("system.backup_complete");
pub const MAINTENANCE_MODE: EventType = EventType::from_static("system.maintenance_mode");
pub const SYSTEM_METRICS: EventType = EventType::from_static("system.metrics");

pub const REQUEST_STARTED: EventType = EventType::from_static("http.request_started");
pub const REQUEST_COMPLETE: EventType = EventType::from_static("http.request_complete");
pub const REQUEST_ERROR: EventType = EventType::from_static("http.request_error");
pub const RATE_LIMITED: EventType = EventType::from_static("http.rate_limited");
pub const AUTH_FAILED: EventType = EventType::from_static("http.auth_failed");

// ─── Event ───────────────────────────────────────────────────────

/// Immutable once published. Cloning shares the payload.
#[derive(Clone)]
pub struct Event {
    pub event_type: EventType,
    payload: Arc<dyn Any + Send + Sync>,
}

impl Event {
    pub fn new<P: Any + Send + Sync>(event_type: EventType, payload: P) -> Self {
        Self {
            event_type,
            payload: Arc::new(payload),
        }
    }

    /// Event with no payload.
    pub fn empty(event_type: EventType) -> Self {
        Self::new(event_type, ())
    }

    /// Borrow the payload as `P`, or `None` if it was published as
    /// something else.
    pub fn payload<P: Any>(&self) -> Option<&P> {
        self.payload.downcast_ref::<P>()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("event_type", &self.event_type)
            .finish_non_exhaustive()
    }
}

// ─── Default subscribers ─────────────────────────────────────────

/// Logging sinks for the system lifecycle events.
pub fn register_system_loggers(bus: &EventBus) {
    bus.subscribe(SYSTEM_STARTED, |e: &Event| {
        tracing::info!(details = ?e.payload::<serde_json::Value>(), "system started");
    });
    bus.subscribe(SYSTEM_SHUTDOWN, |e: &Event| {
        tracing::info!(details = ?e.payload::<serde_json::Value>(), "system shutdown");
    });
    bus.subscribe(DATABASE_ERROR, |e: &Event| {
        tracing::error!(details = ?e.payload::<serde_json::Value>(), "database error");
    });
    bus.subscribe(CACHE_ERROR, |e: &Event| {
        tracing::error!(details = ?e.payload::<serde_json::Value>(), "cache error");
    });
    bus.subscribe(SECURITY_ALERT, |e: &Event| {
        tracing::warn!(details = ?e.payload::<serde_json::Value>(), "security alert");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_downcast() {
        let event = Event::new(USER_CREATED, 42_i64);
        assert_eq!(event.payload::<i64>(), Some(&42));
        assert!(event.payload::<String>().is_none());
    }

    #[test]
    fn static_and_owned_types_compare_equal() {
        assert_eq!(EventType::new("system.metrics"), SYSTEM_METRICS);
        assert_eq!(SYSTEM_METRICS.to_string(), "system.metrics");
    }
}
