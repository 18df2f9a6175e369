//! Subscription Registry
//!
//! Maps event-type names to the handlers currently registered for them.
//! Each stream client owns its own registry; there is no process-wide
//! handler table, so unrelated subscriptions never see each other's events.
//!
//! # Design
//!
//! - Registration returns a [`SubscriptionHandle`] that removes exactly
//!   that one registration, and is a no-op on every call after the first.
//! - When the last handler for a type is removed the type entry is dropped,
//!   so `event_types()` reflects what is actually being listened to.
//! - Dispatch iterates a snapshot of the handler set taken before the first
//!   handler runs. A handler that unsubscribes itself (or another handler)
//!   mid-dispatch neither skips nor double-invokes anyone.
//! - A panicking handler is isolated at the dispatch boundary and logged;
//!   delivery continues with the remaining handlers.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::domain::envelope::MessageEnvelope;

// =============================================================================
// Types
// =============================================================================

/// Handler invoked for every envelope of the type it was registered for.
pub type EventHandler = Arc<dyn Fn(&MessageEnvelope) + Send + Sync>;

/// Registration identifier, unique within one registry.
type HandlerId = u64;

type HandlerMap = HashMap<String, HashMap<HandlerId, EventHandler>>;

// =============================================================================
// Subscription Handle
// =============================================================================

/// Capability that releases exactly one prior registration.
///
/// Dropping the handle does not unsubscribe; call [`unsubscribe`](Self::unsubscribe).
pub struct SubscriptionHandle {
    release: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl SubscriptionHandle {
    /// Create a handle that runs `release` the first time it is invoked.
    #[must_use]
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Mutex::new(Some(Box::new(release))),
        }
    }

    /// Create a handle with nothing to release.
    #[must_use]
    pub fn noop() -> Self {
        Self {
            release: Mutex::new(None),
        }
    }

    /// Release the registration. Subsequent calls do nothing.
    pub fn unsubscribe(&self) {
        let release = self.release.lock().take();
        if let Some(release) = release {
            release();
        }
    }

    /// Whether the registration has not been released yet.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.release.lock().is_some()
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("active", &self.is_active())
            .finish()
    }
}

// =============================================================================
// Dispatch Outcome
// =============================================================================

/// Result of dispatching one envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Handlers that ran to completion.
    pub delivered: usize,
    /// Handlers that panicked.
    pub failed: usize,
}

// =============================================================================
// Subscription Registry
// =============================================================================

/// Event-type keyed handler sets for one stream client.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use dashboard_stream::domain::envelope::MessageEnvelope;
/// use dashboard_stream::domain::subscription::SubscriptionRegistry;
///
/// let registry = SubscriptionRegistry::new();
/// let handle = registry.register("price", Arc::new(|envelope: &MessageEnvelope| {
///     assert_eq!(envelope.event_type, "price");
/// }));
///
/// let envelope = MessageEnvelope::from_frame(Some("price"), "{}", None);
/// assert_eq!(registry.dispatch("price", &envelope).delivered, 1);
///
/// handle.unsubscribe();
/// assert!(!registry.has_handlers("price"));
/// ```
#[derive(Default)]
pub struct SubscriptionRegistry {
    handlers: Arc<RwLock<HandlerMap>>,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an event type.
    pub fn register(&self, event_type: &str, handler: EventHandler) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.handlers
            .write()
            .entry(event_type.to_string())
            .or_default()
            .insert(id, handler);

        let handlers: Weak<RwLock<HandlerMap>> = Arc::downgrade(&self.handlers);
        let event_type = event_type.to_string();

        SubscriptionHandle::new(move || {
            if let Some(handlers) = handlers.upgrade() {
                remove_handler(&handlers, &event_type, id);
            }
        })
    }

    /// Invoke every handler currently registered for `event_type`.
    pub fn dispatch(&self, event_type: &str, envelope: &MessageEnvelope) -> DispatchOutcome {
        let snapshot: Vec<EventHandler> = self
            .handlers
            .read()
            .get(event_type)
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default();

        let mut outcome = DispatchOutcome::default();

        for handler in snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(envelope))) {
                Ok(()) => outcome.delivered += 1,
                Err(panic) => {
                    outcome.failed += 1;
                    tracing::error!(
                        event_type,
                        panic = panic_message(panic.as_ref()),
                        "Subscription handler panicked"
                    );
                }
            }
        }

        outcome
    }

    /// Event types with at least one handler.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("event_types", &self.event_types())
            .finish()
    }
}

fn remove_handler(handlers: &RwLock<HandlerMap>, event_type: &str, id: HandlerId) {
    let mut handlers = handlers.write();
    if let Some(set) = handlers.get_mut(event_type) {
        set.remove(&id);
        if set.is_empty() {
            handlers.remove(event_type);
        }
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

// =============================================================================
// Tests
// =============================================================================
