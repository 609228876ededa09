//! Type-keyed event dispatch.
//!
//! Every event type implements [`Event`] and carries a compile-time [`EventKind`].
//! An [`EventRegistry`] holds at most one handler per kind; registering a second
//! handler for the same kind replaces the first.
//!
//! ```
//! use micro_net::event::{Event, EventKind, EventRegistry};
//!
//! struct Ping(u32);
//!
//! impl Event for Ping {
//!     const KIND: EventKind = EventKind(1);
//! }
//!
//! let mut registry = EventRegistry::new();
//! registry.set(|ping: &mut Ping| ping.0 += 1);
//!
//! let mut ping = Ping(41);
//! registry.call(&mut ping).unwrap();
//! assert_eq!(ping.0, 42);
//! ```
//!
//! The registry is mutated while a server is being configured and only read once it
//! runs, so it is shared behind an `Arc` without locking.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Stable identifier of an event variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKind(pub u16);

impl EventKind {
    /// First kind of the TCP server family.
    pub const TCP_SERVER_BASE: u16 = 128;
    /// First kind of the HTTP server family.
    pub const HTTP_SERVER_BASE: u16 = 192;

    pub const CONNECTION_ACCEPTED: EventKind = EventKind(Self::TCP_SERVER_BASE + 1);
    pub const DATA_RECEIVED: EventKind = EventKind(Self::TCP_SERVER_BASE + 2);
    pub const DATA_SENT: EventKind = EventKind(Self::TCP_SERVER_BASE + 3);

    pub const HTTP_REQUEST_RECEIVED: EventKind = EventKind(Self::HTTP_SERVER_BASE + 1);
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An event that can be dispatched through an [`EventRegistry`].
pub trait Event: Send + 'static {
    const KIND: EventKind;
}

/// A registered handler, shared so it can be called without holding the registry.
pub type SharedHandler<E> = Arc<dyn Fn(&mut E) + Send + Sync>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("no handler registered for event {kind}")]
    Unregistered { kind: EventKind },

    #[error("handler registered for event {kind} expects another event type")]
    PayloadMismatch { kind: EventKind },
}

#[derive(Default)]
pub struct EventRegistry {
    handlers: HashMap<EventKind, Box<dyn Any + Send + Sync>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the handler for `E`, replacing any handler already registered for `E::KIND`.
    pub fn set<E, F>(&mut self, handler: F) -> &mut Self
    where
        E: Event,
        F: Fn(&mut E) + Send + Sync + 'static,
    {
        let handler: SharedHandler<E> = Arc::new(handler);
        self.handlers.insert(E::KIND, Box::new(handler));
        self
    }

    /// Dispatches `event` to the handler registered for its kind.
    ///
    /// # Errors
    ///
    /// [`EventError::Unregistered`] when nothing is registered for `E::KIND`, and
    /// [`EventError::PayloadMismatch`] when the registered handler was installed for
    /// a different event type that shares the kind.
    pub fn call<E: Event>(&self, event: &mut E) -> Result<(), EventError> {
        let handler = self.handler::<E>()?;
        handler(event);
        Ok(())
    }

    /// A clone of the handler registered for `E`, usable after the registry is gone.
    pub fn handler<E: Event>(&self) -> Result<SharedHandler<E>, EventError> {
        let stored = self.handlers.get(&E::KIND).ok_or(EventError::Unregistered { kind: E::KIND })?;
        stored
            .downcast_ref::<SharedHandler<E>>()
            .map(Arc::clone)
            .ok_or(EventError::PayloadMismatch { kind: E::KIND })
    }

    /// Removes the handler for `E`, returning whether one was registered.
    pub fn remove<E: Event>(&mut self) -> bool {
        self.handlers.remove(&E::KIND).is_some()
    }

    pub fn has<E: Event>(&self) -> bool {
        self.handlers.contains_key(&E::KIND)
    }

    pub fn has_kind(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().copied().collect();
        kinds.sort_unstable();
        f.debug_struct("EventRegistry").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(usize);
    impl Event for Counter {
        const KIND: EventKind = EventKind(7);
    }

    struct Imposter;
    impl Event for Imposter {
        const KIND: EventKind = EventKind(7);
    }

    struct Other;
    impl Event for Other {
        const KIND: EventKind = EventKind(8);
    }

    #[test]
    fn test_last_write_wins() {
        let mut registry = EventRegistry::new();
        registry.set(|c: &mut Counter| c.0 += 1);
        registry.set(|c: &mut Counter| c.0 += 100);

        let mut counter = Counter(0);
        registry.call(&mut counter).unwrap();
        assert_eq!(counter.0, 100);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregistered() {
        let registry = EventRegistry::new();
        assert_eq!(registry.call(&mut Other), Err(EventError::Unregistered { kind: EventKind(8) }));
    }

    #[test]
    fn test_payload_mismatch() {
        let mut registry = EventRegistry::new();
        registry.set(|_: &mut Counter| {});

        assert!(registry.has::<Imposter>());
        assert_eq!(registry.call(&mut Imposter), Err(EventError::PayloadMismatch { kind: EventKind(7) }));
    }

    #[test]
    fn test_remove_and_has() {
        let mut registry = EventRegistry::new();
        registry.set(|_: &mut Other| {});

        assert!(registry.has::<Other>());
        assert!(registry.has_kind(EventKind(8)));
        assert!(registry.remove::<Other>());
        assert!(!registry.remove::<Other>());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_handler_outlives_registry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = {
            let mut registry = EventRegistry::new();
            let seen = Arc::clone(&calls);
            registry.set(move |_: &mut Other| {
                seen.fetch_add(1, Ordering::SeqCst);
            });
            registry.handler::<Other>().unwrap()
        };

        handler(&mut Other);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_event_kinds_are_distinct() {
        let kinds = [
            EventKind::CONNECTION_ACCEPTED,
            EventKind::DATA_RECEIVED,
            EventKind::DATA_SENT,
            EventKind::HTTP_REQUEST_RECEIVED,
        ];
        assert_eq!(kinds.map(|k| k.0), [129, 130, 131, 193]);
    }
}
