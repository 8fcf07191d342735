//! In-process profile notifications.
//!
//! `EventPublisher` is a plain registry of listeners owned by whoever wires
//! the application together and handed to the service explicitly. Delivery
//! is synchronous: `publish` returns once every listener has seen the event.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use crate::Profile;

/// Notification about a change in the profile store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProfileEvent {
    /// A new profile was written; carries the stored value with its id.
    Created(Profile),
}

impl ProfileEvent {
    pub fn profile(&self) -> &Profile {
        match self {
            ProfileEvent::Created(p) => p,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProfileEvent::Created(_) => "profile_created",
        }
    }
}

/// Receiver of profile events. Listeners run on the publishing task, so they
/// must not block for long. A panicking listener is contained by the
/// publisher and does not stop later listeners.
pub trait ProfileListener: Send + Sync {
    fn on_event(&self, event: &ProfileEvent);
}

impl<F> ProfileListener for F
where
    F: Fn(&ProfileEvent) + Send + Sync,
{
    fn on_event(&self, event: &ProfileEvent) {
        self(event)
    }
}

/// Synchronous publish/subscribe registry.
#[derive(Default)]
pub struct EventPublisher {
    listeners: RwLock<Vec<Arc<dyn ProfileListener>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Listeners are called in registration order.
    pub fn subscribe(&self, listener: Arc<dyn ProfileListener>) {
        // A poisoned lock only means a listener panicked mid-registration; the
        // Vec itself is still intact.
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        listeners.push(listener);
    }

    /// Deliver `event` to every registered listener on the calling task.
    ///
    /// A listener panic is reported by the panic hook and skipped; the
    /// remaining listeners still run.
    pub fn publish(&self, event: &ProfileEvent) {
        // Snapshot so listeners may subscribe others without deadlocking.
        let listeners: Vec<_> = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for listener in listeners {
            let _ = panic::catch_unwind(AssertUnwindSafe(|| listener.on_event(event)));
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPublisher")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Listener that keeps every event it receives. Useful in tests and demos.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: std::sync::Mutex<Vec<ProfileEvent>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProfileEvent> {
        self.events
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }
}

impl ProfileListener for RecordingListener {
    fn on_event(&self, event: &ProfileEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
