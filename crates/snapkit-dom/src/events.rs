//! Event listeners and the per-document listener registry.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};

use crate::node::NodeId;
use crate::Atom;

/// Error type returned by listener bodies.
pub type ListenerError = Box<dyn std::error::Error + 'static>;

/// Future produced by invoking a listener.
pub type ListenerFuture = LocalBoxFuture<'static, Result<(), ListenerError>>;

/// Receives listener failures that would otherwise be lost, since dispatch
/// does not wait for listeners.
pub type FailureHook = Rc<dyn Fn(ListenerFailure)>;

/// A registered callback.
///
/// Equality is identity: two handles are equal when they share the same
/// allocation, which is what [`Dom::remove_event_listener`](crate::Dom::remove_event_listener)
/// matches on.
#[derive(Clone)]
pub struct EventListener {
    callback: Rc<dyn Fn(Event) -> ListenerFuture>,
}

impl EventListener {
    /// Wrap an async callback.
    pub fn new<F, Fut>(callback: F) -> Self
    where
        F: Fn(Event) -> Fut + 'static,
        Fut: Future<Output = Result<(), ListenerError>> + 'static,
    {
        Self {
            callback: Rc::new(move |event| callback(event).boxed_local()),
        }
    }

    /// Wrap a callback that never suspends or fails.
    pub fn sync<F>(callback: F) -> Self
    where
        F: Fn(&Event) + 'static,
    {
        Self {
            callback: Rc::new(move |event| {
                callback(&event);
                futures::future::ready(Ok(())).boxed_local()
            }),
        }
    }

    pub(crate) fn invoke(&self, event: Event) -> ListenerFuture {
        (self.callback)(event)
    }
}

impl PartialEq for EventListener {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }
}

impl Eq for EventListener {}

impl fmt::Debug for EventListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventListener({:p})", Rc::as_ptr(&self.callback))
    }
}

/// Parameters for a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInit {
    pub name: Atom,
    pub bubbles: bool,
}

impl EventInit {
    /// A non-bubbling event.
    pub fn new(name: &str) -> Self {
        Self {
            name: Atom::from(name),
            bubbles: false,
        }
    }

    pub fn bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }
}

/// Event delivered to a listener.
#[derive(Debug, Clone)]
pub struct Event {
    pub name: Atom,
    /// Node the event was dispatched at.
    pub target: NodeId,
    /// Node whose listener is being invoked.
    pub current_target: NodeId,
    pub bubbles: bool,
    /// The listener being invoked, so it can remove itself.
    pub listener: EventListener,
}

/// A listener that failed after dispatch returned.
#[derive(Debug)]
pub enum ListenerFailure {
    Error { event: Atom, error: ListenerError },
    Panicked { event: Atom, message: String },
}

impl fmt::Display for ListenerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerFailure::Error { event, error } => {
                write!(f, "'{}' listener failed: {}", event, error)
            }
            ListenerFailure::Panicked { event, message } => {
                write!(f, "'{}' listener panicked: {}", event, message)
            }
        }
    }
}

/// Listeners keyed by target node and event name, in registration order.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    map: HashMap<(NodeId, Atom), Vec<EventListener>>,
}

impl ListenerRegistry {
    pub(crate) fn add(&mut self, node: NodeId, name: Atom, listener: EventListener) {
        self.map.entry((node, name)).or_default().push(listener);
    }

    /// Remove the first registration matching `listener`.
    pub(crate) fn remove(&mut self, node: NodeId, name: &Atom, listener: &EventListener) -> bool {
        let key = (node, name.clone());
        let Some(list) = self.map.get_mut(&key) else {
            return false;
        };
        let Some(pos) = list.iter().position(|l| l == listener) else {
            return false;
        };
        list.remove(pos);
        if list.is_empty() {
            self.map.remove(&key);
        }
        true
    }

    /// Copy of the current registrations, used as the dispatch snapshot.
    pub(crate) fn snapshot(&self, node: NodeId, name: &Atom) -> Vec<EventListener> {
        self.map
            .get(&(node, name.clone()))
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, node: NodeId, name: &Atom) -> usize {
        self.map
            .get(&(node, name.clone()))
            .map_or(0, Vec::len)
    }

    /// Total number of registrations.
    pub(crate) fn len(&self) -> usize {
        self.map.values().map(Vec::len).sum()
    }

    pub(crate) fn clear(&mut self) {
        self.map.clear();
    }
}
