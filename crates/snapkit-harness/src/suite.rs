//! Suites and their cases.

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};

use crate::completion::Done;
use crate::context::TestContext;
use crate::HarnessError;

pub(crate) type CaseBody =
    Rc<dyn Fn(TestContext, Done) -> LocalBoxFuture<'static, Result<(), HarnessError>>>;

/// How a case reports that it has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Completion {
    /// The body returning `Ok` completes the case.
    OnReturn,
    /// Only [`Done`] completes the case; the body returning `Ok` does not.
    Explicit,
}

pub(crate) struct Case {
    pub(crate) name: String,
    pub(crate) body: CaseBody,
    pub(crate) completion: Completion,
}

/// A named, ordered group of cases sharing one snapshot namespace.
pub struct Suite {
    name: String,
    cases: Vec<Case>,
}

impl Suite {
    pub fn describe(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cases: Vec::new(),
        }
    }

    /// Add a case that completes when its body returns `Ok`.
    pub fn it<F, Fut>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(TestContext) -> Fut + 'static,
        Fut: Future<Output = Result<(), HarnessError>> + 'static,
    {
        self.push(
            name.into(),
            Rc::new(move |ctx: TestContext, _done: Done| body(ctx).boxed_local()),
            Completion::OnReturn,
        )
    }

    /// Add a case that completes only when it signals [`Done`].
    ///
    /// The body typically builds its tree, registers a trigger listener that
    /// holds the token, and returns. An error returned by the body still
    /// fails the case immediately.
    pub fn it_with_done<F, Fut>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(TestContext, Done) -> Fut + 'static,
        Fut: Future<Output = Result<(), HarnessError>> + 'static,
    {
        self.push(
            name.into(),
            Rc::new(move |ctx: TestContext, done: Done| body(ctx, done).boxed_local()),
            Completion::Explicit,
        )
    }

    fn push(mut self, name: String, body: CaseBody, completion: Completion) -> Self {
        self.cases.push(Case {
            name,
            body,
            completion,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case names in run order.
    pub fn case_names(&self) -> impl Iterator<Item = &str> {
        self.cases.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub(crate) fn cases(&self) -> &[Case] {
        &self.cases
    }
}

impl fmt::Debug for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suite")
            .field("name", &self.name)
            .field("cases", &self.case_names().collect::<Vec<_>>())
            .finish()
    }
}
