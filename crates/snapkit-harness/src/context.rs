//! What a case body and its listeners see.

use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;

use snapkit_capture::{ScreenshotBarrier, SnapshotKey};
use snapkit_dom::{Dom, Event, EventInit, EventListener, ListenerError, NodeId, Style};
use tracing::{debug, trace};

use crate::HarnessError;

/// Lifecycle of a test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseState {
    /// The body is constructing its tree.
    Building,
    /// The initial screenshot matched; the trigger has not fired yet.
    AwaitingTrigger,
    /// The trigger event was dispatched.
    Triggered,
    /// The mutation is applied and the final screenshot is being taken.
    AwaitingBarrier,
    Completed,
    Failed,
    TimedOut,
}

impl CaseState {
    /// Whether the case has been decided.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CaseState::Completed | CaseState::Failed | CaseState::TimedOut
        )
    }
}

/// Handle given to a case body. Cheap to clone into listeners.
#[derive(Clone)]
pub struct TestContext {
    inner: Rc<ContextInner>,
}

struct ContextInner {
    suite: String,
    case: String,
    dom: Dom,
    barrier: Rc<ScreenshotBarrier>,
    state: Rc<Cell<CaseState>>,
    crossings: Rc<Cell<u32>>,
}

impl TestContext {
    pub(crate) fn new(
        suite: &str,
        case: &str,
        dom: Dom,
        barrier: Rc<ScreenshotBarrier>,
        state: Rc<Cell<CaseState>>,
        crossings: Rc<Cell<u32>>,
    ) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                suite: suite.to_string(),
                case: case.to_string(),
                dom,
                barrier,
                state,
                crossings,
            }),
        }
    }

    pub fn dom(&self) -> &Dom {
        &self.inner.dom
    }

    /// The root container, empty at the start of every case.
    pub fn body(&self) -> NodeId {
        self.inner.dom.body()
    }

    pub fn suite_name(&self) -> &str {
        &self.inner.suite
    }

    pub fn case_name(&self) -> &str {
        &self.inner.case
    }

    pub fn state(&self) -> CaseState {
        self.inner.state.get()
    }

    /// Barrier crossings started so far in this case.
    pub fn crossings(&self) -> u32 {
        self.inner.crossings.get()
    }

    /// Create an element. See [`Dom::create`].
    pub fn create(
        &self,
        tag: &str,
        style: impl Into<Style>,
        children: impl IntoIterator<Item = NodeId>,
    ) -> Result<NodeId, HarnessError> {
        Ok(self.inner.dom.create(tag, style, children)?)
    }

    pub fn create_text(&self, content: impl Into<String>) -> NodeId {
        self.inner.dom.create_text(content)
    }

    /// Capture the current tree and compare it with the baseline for the
    /// next snapshot key of this case.
    ///
    /// Crossings are numbered from 1 in the order they start, so the initial
    /// screenshot is always `<suite>/<case>/1`.
    pub async fn match_screenshot(&self) -> Result<(), HarnessError> {
        if self.state().is_terminal() {
            return Err(HarnessError::Aborted(format!(
                "screenshot requested after case '{}' finished",
                self.inner.case
            )));
        }

        let index = self.inner.crossings.get() + 1;
        self.inner.crossings.set(index);
        let key = SnapshotKey::new(&self.inner.suite, &self.inner.case, index);

        if self.state() == CaseState::Triggered {
            self.transition(CaseState::AwaitingBarrier);
        }

        let outcome = self.inner.barrier.match_screenshot(&self.inner.dom, &key).await?;
        debug!(%key, ?outcome, "Barrier crossed");
        if self.state().is_terminal() {
            return Err(HarnessError::Aborted(format!(
                "case '{}' finished during screenshot {key}",
                self.inner.case
            )));
        }

        if self.state() == CaseState::Building {
            self.transition(CaseState::AwaitingTrigger);
        }
        Ok(())
    }

    /// Register a listener whose errors fail the case.
    ///
    /// Returns the registered handle so the listener can later be removed,
    /// typically from inside itself via [`Event::listener`].
    pub fn add_event_listener<F, Fut>(
        &self,
        node: NodeId,
        event: &str,
        callback: F,
    ) -> Result<EventListener, HarnessError>
    where
        F: Fn(Event) -> Fut + 'static,
        Fut: Future<Output = Result<(), HarnessError>> + 'static,
    {
        let listener = EventListener::new(move |event| {
            let fut = callback(event);
            async move { fut.await.map_err(|e| Box::new(e) as ListenerError) }
        });
        self.inner.dom.add_event_listener(node, event, listener.clone())?;
        Ok(listener)
    }

    pub fn remove_event_listener(&self, node: NodeId, event: &str, listener: &EventListener) -> bool {
        self.inner.dom.remove_event_listener(node, event, listener)
    }

    /// Fire the trigger: a bubbling click at `node`.
    pub fn click(&self, node: NodeId) -> Result<usize, HarnessError> {
        self.dispatch_event(node, EventInit::new("click").bubbles(true))
    }

    /// Fire the trigger: a non-bubbling `event` at `node`.
    pub fn dispatch(&self, node: NodeId, event: &str) -> Result<usize, HarnessError> {
        self.dispatch_event(node, EventInit::new(event))
    }

    pub fn dispatch_event(&self, node: NodeId, init: EventInit) -> Result<usize, HarnessError> {
        self.transition(CaseState::Triggered);
        Ok(self.inner.dom.dispatch_event(node, init)?)
    }

    fn transition(&self, next: CaseState) {
        let current = self.inner.state.get();
        if current.is_terminal() || current == next {
            return;
        }
        trace!(case = %self.inner.case, from = ?current, to = ?next, "Case state");
        self.inner.state.set(next);
    }
}
