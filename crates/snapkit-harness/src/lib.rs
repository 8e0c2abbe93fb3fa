//! # SnapKit Harness
//!
//! Runs visual test cases against a [`Renderer`](snapkit_capture::Renderer):
//! build a tree, cross the screenshot barrier, trigger a mutation, cross the
//! barrier again, signal completion.
//!
//! ## Design Goals
//!
//! 1. **Exactly-once completion**: [`Done`] is a one-shot token that may be
//!    signaled from any listener; later signals are ignored
//! 2. **No hangs**: listener errors and panics fail the case through the same
//!    token, and every case runs under a timeout
//! 3. **No leakage**: the root container and its listeners are reset before
//!    and after every case
//!
//! ## Example
//!
//! ```ignore
//! let harness = Harness::builder()
//!     .config(HarnessConfig::default().apply_env()?)
//!     .renderer(MyRenderer::new())
//!     .build()?;
//!
//! let suite = Suite::describe("delete-block-in-inlines")
//!     .it_with_done("beginning-001", beginning);
//!
//! let report = harness.run_blocking(&suite)?;
//! assert!(report.passed());
//! ```

pub mod completion;
pub mod config;
pub mod context;
pub mod logging;
pub mod runner;
pub mod suite;

pub use completion::Done;
pub use config::HarnessConfig;
pub use context::{CaseState, TestContext};
pub use runner::{CaseOutcome, Harness, HarnessBuilder, SuiteReport};
pub use suite::Suite;

use std::time::Duration;

use snapkit_capture::{BarrierError, CaptureError, MismatchError};
use snapkit_dom::{DomError, ListenerError, ListenerFailure};
use thiserror::Error;

/// Errors that fail a test case.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error(transparent)]
    Mismatch(#[from] MismatchError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    #[error("'{event}' listener failed: {source}")]
    Listener {
        event: String,
        source: ListenerError,
    },

    #[error("'{event}' listener panicked: {message}")]
    ListenerPanicked { event: String, message: String },

    #[error("Case body panicked: {0}")]
    Panicked(String),

    #[error("Case timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Case aborted: {0}")]
    Aborted(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<BarrierError> for HarnessError {
    fn from(err: BarrierError) -> Self {
        match err {
            BarrierError::Mismatch(m) => HarnessError::Mismatch(m),
            BarrierError::Capture(c) => HarnessError::Capture(c),
            BarrierError::Interrupted(key) => {
                HarnessError::Aborted(format!("document reset while capturing {key}"))
            }
        }
    }
}

impl From<ListenerFailure> for HarnessError {
    /// Recover the typed error a harness listener returned, if it was one.
    fn from(failure: ListenerFailure) -> Self {
        match failure {
            ListenerFailure::Panicked { event, message } => HarnessError::ListenerPanicked {
                event: event.to_string(),
                message,
            },
            ListenerFailure::Error { event, error } => match error.downcast::<HarnessError>() {
                Ok(err) => *err,
                Err(error) => match error.downcast::<DomError>() {
                    Ok(err) => HarnessError::Dom(*err),
                    Err(source) => HarnessError::Listener {
                        event: event.to_string(),
                        source,
                    },
                },
            },
        }
    }
}

impl HarnessError {
    /// The mismatch behind this failure, if it was one.
    pub fn as_mismatch(&self) -> Option<&MismatchError> {
        match self {
            HarnessError::Mismatch(m) => Some(m),
            _ => None,
        }
    }
}
