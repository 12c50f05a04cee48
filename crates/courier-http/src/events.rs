//! Pipeline event notifications
//!
//! A synchronous multicast registry keyed by [`EventKind`]. Listeners run in
//! registration order on the task that emits. A listener that returns an
//! error or panics is reported through `tracing` and skipped; it never stops
//! the other listeners or the request that emitted the event.

use std::{
    collections::HashMap,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
};

use tracing::warn;

use crate::request::{HttpMethod, RequestConfig};

/// Pipeline milestones that can be observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    OptionsAssembled,
    RequestIntercepted,
    ResponseReceived,
    ResponseIntercepted,
    RequestFailed,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::OptionsAssembled,
        EventKind::RequestIntercepted,
        EventKind::ResponseReceived,
        EventKind::ResponseIntercepted,
        EventKind::RequestFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::OptionsAssembled => "optionsAssembled",
            EventKind::RequestIntercepted => "requestIntercepted",
            EventKind::ResponseReceived => "responseReceived",
            EventKind::ResponseIntercepted => "responseIntercepted",
            EventKind::RequestFailed => "requestFailed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event payloads
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Defaults and per-call options have been merged
    OptionsAssembled { config: RequestConfig },
    /// The request interceptor returned the config to dispatch
    RequestIntercepted { config: RequestConfig },
    /// Response head arrived
    ResponseReceived {
        method: HttpMethod,
        url: String,
        status: u16,
    },
    /// The response interceptor finished
    ResponseIntercepted { method: HttpMethod, url: String },
    /// Dispatch failed at the transport level
    RequestFailed {
        method: HttpMethod,
        url: String,
        error: String,
    },
}

impl ClientEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ClientEvent::OptionsAssembled { .. } => EventKind::OptionsAssembled,
            ClientEvent::RequestIntercepted { .. } => EventKind::RequestIntercepted,
            ClientEvent::ResponseReceived { .. } => EventKind::ResponseReceived,
            ClientEvent::ResponseIntercepted { .. } => EventKind::ResponseIntercepted,
            ClientEvent::RequestFailed { .. } => EventKind::RequestFailed,
        }
    }
}

/// Result returned by listeners
pub type ListenerResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

type SharedListener = Arc<dyn Fn(&ClientEvent) -> ListenerResult + Send + Sync>;

/// Handle identifying one registration, used to remove it again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Listener registry
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<HashMap<EventKind, Vec<(ListenerId, SharedListener)>>>,
    next_id: AtomicU64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for kind in EventKind::ALL {
            map.entry(&kind.as_str(), &self.listener_count(kind));
        }
        map.finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for one event kind
    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&ClientEvent) -> ListenerResult + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        listeners
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove one registration, or every listener of `kind` when `id` is `None`.
    ///
    /// Returns the number of listeners removed.
    pub fn off(&self, kind: EventKind, id: Option<ListenerId>) -> usize {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        let Some(registered) = listeners.get_mut(&kind) else {
            return 0;
        };

        let before = registered.len();
        match id {
            Some(id) => registered.retain(|(existing, _)| *existing != id),
            None => registered.clear(),
        }
        let removed = before - registered.len();
        if registered.is_empty() {
            listeners.remove(&kind);
        }
        removed
    }

    /// Invoke the listeners of the event's kind in registration order.
    ///
    /// Returns the number of listeners that failed.
    pub fn emit(&self, event: &ClientEvent) -> usize {
        let kind = event.kind();
        // Snapshot so listeners may register or remove listeners themselves
        let snapshot: Vec<SharedListener> = {
            let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
            match listeners.get(&kind) {
                Some(registered) => registered.iter().map(|(_, l)| l.clone()).collect(),
                None => return 0,
            }
        };

        let mut failures = 0;
        for listener in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    warn!(event = %kind, "event listener failed: {e}");
                }
                Err(payload) => {
                    failures += 1;
                    warn!(event = %kind, "event listener panicked: {}", panic_message(&*payload));
                }
            }
        }
        failures
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        listeners.get(&kind).map_or(0, Vec::len)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
