//! Shared document handle and event dispatch.

use std::any::Any;
use std::cell::RefCell;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::FutureExt;
use tokio::task::AbortHandle;
use tracing::{debug, trace, warn};

use crate::document::{Document, Mutation};
use crate::events::{Event, EventInit, EventListener, FailureHook, ListenerFailure, ListenerFuture};
use crate::node::{NodeId, Style};
use crate::{Atom, DomError};

/// Cloneable handle to a [`Document`], shared by test bodies and listener
/// closures.
///
/// Every method borrows the document only for the duration of the call, so
/// listeners are free to mutate the tree while a dispatch is in progress.
#[derive(Clone, Default)]
pub struct Dom {
    inner: Rc<RefCell<Document>>,
}

impl Dom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with shared access to the document.
    pub fn read<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&self.inner.borrow())
    }

    /// Run `f` with exclusive access to the document.
    pub fn write<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }

    /// The root container.
    pub fn body(&self) -> NodeId {
        self.inner.borrow().body()
    }

    pub fn create_text(&self, content: impl Into<String>) -> NodeId {
        self.inner.borrow_mut().create_text(content)
    }

    pub fn create_comment(&self, data: impl Into<String>) -> NodeId {
        self.inner.borrow_mut().create_comment(data)
    }

    pub fn create(
        &self,
        tag: &str,
        style: impl Into<Style>,
        children: impl IntoIterator<Item = NodeId>,
    ) -> Result<NodeId, DomError> {
        self.inner.borrow_mut().create(tag, style, children)
    }

    pub fn append(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.inner.borrow_mut().append(parent, child)
    }

    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<NodeId, DomError> {
        self.inner.borrow_mut().remove_child(parent, child)
    }

    pub fn set_style(
        &self,
        node: NodeId,
        property: &str,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        self.inner.borrow_mut().set_style(node, property, value)
    }

    pub fn parent(&self, node: NodeId) -> Result<Option<NodeId>, DomError> {
        self.inner.borrow().parent(node)
    }

    pub fn children(&self, node: NodeId) -> Result<Vec<NodeId>, DomError> {
        Ok(self.inner.borrow().children(node)?.to_vec())
    }

    pub fn text_content(&self, node: NodeId) -> Result<String, DomError> {
        self.inner.borrow().text_content(node)
    }

    pub fn is_connected(&self, node: NodeId) -> Result<bool, DomError> {
        self.inner.borrow().is_connected(node)
    }

    /// Serialize the root container.
    pub fn to_markup(&self) -> String {
        self.inner.borrow().to_markup()
    }

    pub fn take_mutations(&self) -> Vec<Mutation> {
        self.inner.borrow_mut().take_mutations()
    }

    /// Empty the root container, drop all listeners and abort listener
    /// tasks that are still suspended.
    pub fn reset(&self) {
        self.inner.borrow_mut().reset();
    }

    pub fn add_event_listener(
        &self,
        node: NodeId,
        event: &str,
        listener: EventListener,
    ) -> Result<(), DomError> {
        let mut doc = self.inner.borrow_mut();
        doc.check(node)?;
        doc.listeners.add(node, Atom::from(event), listener);
        trace!(?node, event, "Listener added");
        Ok(())
    }

    /// Remove one registration of `listener`. Returns `false` if none was
    /// registered; that is not an error.
    pub fn remove_event_listener(&self, node: NodeId, event: &str, listener: &EventListener) -> bool {
        let removed = self
            .inner
            .borrow_mut()
            .listeners
            .remove(node, &Atom::from(event), listener);
        trace!(?node, event, removed, "Listener removed");
        removed
    }

    /// Number of listeners registered for `event` at `node`.
    pub fn listener_count(&self, node: NodeId, event: &str) -> usize {
        self.inner
            .borrow()
            .listeners
            .count(node, &Atom::from(event))
    }

    /// Total registrations across the document.
    pub fn total_listeners(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Suspended listener tasks that have not finished.
    pub fn pending_listeners(&self) -> usize {
        self.inner.borrow().pending_listeners()
    }

    /// Route listener failures to `hook`. Cleared by [`Dom::reset`].
    pub fn set_failure_hook(&self, hook: Option<FailureHook>) {
        self.inner.borrow_mut().failure_hook = hook;
    }

    /// Dispatch a non-bubbling event at `node`.
    pub fn dispatch(&self, node: NodeId, event: &str) -> Result<usize, DomError> {
        self.dispatch_event(node, EventInit::new(event))
    }

    /// Simulate a click: a bubbling `click` dispatched at `node`.
    pub fn click(&self, node: NodeId) -> Result<usize, DomError> {
        self.dispatch_event(node, EventInit::new("click").bubbles(true))
    }

    /// Dispatch an event and return how many listeners were invoked.
    ///
    /// The listener list (for the target and, when bubbling, every ancestor)
    /// is captured before the first listener runs. Registrations added or
    /// removed by listeners take effect from the next dispatch.
    ///
    /// Each listener runs inline up to its first suspension point. Listeners
    /// that suspend are finished on the current `LocalSet`; dispatch does not
    /// wait for them. [`Dom::reset`] aborts any that are still running.
    ///
    /// # Panics
    ///
    /// Panics if a listener suspends while no `tokio::task::LocalSet` is
    /// running on this thread.
    pub fn dispatch_event(&self, node: NodeId, init: EventInit) -> Result<usize, DomError> {
        let (pass, hook) = {
            let doc = self.inner.borrow();
            doc.check(node)?;

            let mut path = vec![node];
            if init.bubbles {
                let mut current = doc.parent(node)?;
                while let Some(id) = current {
                    path.push(id);
                    current = doc.parent(id)?;
                }
            }

            let pass: Vec<(NodeId, EventListener)> = path
                .into_iter()
                .flat_map(|id| {
                    doc.listeners
                        .snapshot(id, &init.name)
                        .into_iter()
                        .map(move |l| (id, l))
                })
                .collect();
            (pass, doc.failure_hook.clone())
        };

        debug!(
            target_node = ?node,
            event = %init.name,
            listeners = pass.len(),
            "Dispatching event"
        );

        let invoked = pass.len();
        for (current_target, listener) in pass {
            let event = Event {
                name: init.name.clone(),
                target: node,
                current_target,
                bubbles: init.bubbles,
                listener: listener.clone(),
            };
            if let Some(task) = run_listener(init.name.clone(), &listener, event, hook.clone()) {
                self.inner.borrow_mut().track_listener(task);
            }
        }
        Ok(invoked)
    }
}

/// Poll a listener future once in place; hand it to the `LocalSet` if it
/// suspends and return the spawned task.
fn run_listener(
    name: Atom,
    listener: &EventListener,
    event: Event,
    hook: Option<FailureHook>,
) -> Option<AbortHandle> {
    // Synchronous listeners do all their work inside `invoke`.
    let mut future = match panic::catch_unwind(AssertUnwindSafe(|| listener.invoke(event))) {
        Ok(future) => future,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            report(hook, ListenerFailure::Panicked { event: name, message });
            return None;
        }
    };

    let waker = futures::task::noop_waker();
    let mut cx = Context::from_waker(&waker);

    match panic::catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut cx))) {
        Ok(Poll::Ready(Ok(()))) => None,
        Ok(Poll::Ready(Err(error))) => {
            report(hook, ListenerFailure::Error { event: name, error });
            None
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            report(hook, ListenerFailure::Panicked { event: name, message });
            None
        }
        Ok(Poll::Pending) => {
            trace!(event = %name, "Listener suspended");
            let task = tokio::task::spawn_local(finish_listener(name, future, hook));
            Some(task.abort_handle())
        }
    }
}

fn finish_listener(
    name: Atom,
    future: ListenerFuture,
    hook: Option<FailureHook>,
) -> impl Future<Output = ()> {
    async move {
        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => report(hook, ListenerFailure::Error { event: name, error }),
            Err(payload) => report(
                hook,
                ListenerFailure::Panicked {
                    event: name,
                    message: panic_message(payload.as_ref()),
                },
            ),
        }
    }
}

fn report(hook: Option<FailureHook>, failure: ListenerFailure) {
    match hook {
        Some(hook) => hook(failure),
        None => warn!(%failure, "Unhandled listener failure"),
    }
}

/// Text of a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
