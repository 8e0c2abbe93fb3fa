//! The per-case completion token.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::context::CaseState;
use crate::HarnessError;

pub(crate) type CompletionReceiver = oneshot::Receiver<Result<(), HarnessError>>;

/// One-shot signal that a case has finished.
///
/// Clones share one underlying token. The first [`complete`](Done::complete)
/// or [`fail`](Done::fail) decides the case; every later call returns `false`
/// and is logged.
#[derive(Clone)]
pub struct Done {
    inner: Rc<DoneInner>,
}

struct DoneInner {
    case: String,
    sender: RefCell<Option<oneshot::Sender<Result<(), HarnessError>>>>,
    state: Rc<Cell<CaseState>>,
}

impl Done {
    pub(crate) fn new(case: &str, state: Rc<Cell<CaseState>>) -> (Self, CompletionReceiver) {
        let (tx, rx) = oneshot::channel();
        let done = Self {
            inner: Rc::new(DoneInner {
                case: case.to_string(),
                sender: RefCell::new(Some(tx)),
                state,
            }),
        };
        (done, rx)
    }

    /// Signal success. Returns `false` if the case was already decided.
    pub fn complete(&self) -> bool {
        self.signal(Ok(()))
    }

    /// Signal failure. Returns `false` if the case was already decided.
    pub fn fail(&self, error: impl Into<HarnessError>) -> bool {
        self.signal(Err(error.into()))
    }

    /// Whether the case has been decided.
    pub fn is_signaled(&self) -> bool {
        self.inner.sender.borrow().is_none()
    }

    /// A handle that does not keep the case alive.
    pub(crate) fn downgrade(&self) -> WeakDone {
        WeakDone(Rc::downgrade(&self.inner))
    }

    fn signal(&self, result: Result<(), HarnessError>) -> bool {
        // A timed-out case is decided even though nobody signaled it.
        let sender = if self.inner.state.get().is_terminal() {
            None
        } else {
            self.inner.sender.borrow_mut().take()
        };
        let Some(sender) = sender else {
            match &result {
                Ok(()) => warn!(case = %self.inner.case, "Completion signaled more than once, ignoring"),
                Err(e) => warn!(case = %self.inner.case, error = %e, "Failure after completion, ignoring"),
            }
            return false;
        };

        let next = if result.is_ok() {
            CaseState::Completed
        } else {
            CaseState::Failed
        };
        self.inner.state.set(next);
        debug!(case = %self.inner.case, state = ?next, "Case signaled");

        // The runner may already have given up on this case.
        let _ = sender.send(result);
        true
    }
}

impl fmt::Debug for Done {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Done")
            .field("case", &self.inner.case)
            .field("signaled", &self.is_signaled())
            .finish()
    }
}

/// Non-owning [`Done`], held by the document's failure hook.
#[derive(Clone)]
pub(crate) struct WeakDone(Weak<DoneInner>);

impl WeakDone {
    pub(crate) fn upgrade(&self) -> Option<Done> {
        self.0.upgrade().map(|inner| Done { inner })
    }
}
