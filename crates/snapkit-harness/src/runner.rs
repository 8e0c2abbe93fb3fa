//! Running suites.

use std::cell::Cell;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use snapkit_capture::{
    BaselineStore, Comparator, DirectoryBaselines, Renderer, ScreenshotBarrier, ToleranceComparator,
};
use snapkit_dom::{panic_message, Dom, ListenerFailure};
use tokio::task::LocalSet;
use tracing::{info, info_span, warn, Instrument};

use crate::completion::Done;
use crate::config::HarnessConfig;
use crate::context::{CaseState, TestContext};
use crate::suite::{Case, Completion, Suite};
use crate::HarnessError;

/// Result of one case.
#[derive(Debug)]
pub struct CaseOutcome {
    pub name: String,
    pub state: CaseState,
    pub error: Option<HarnessError>,
    /// Barrier crossings the case started.
    pub crossings: u32,
    pub elapsed: Duration,
}

impl CaseOutcome {
    pub fn passed(&self) -> bool {
        self.error.is_none() && self.state == CaseState::Completed
    }
}

/// Results of a suite, in case order.
#[derive(Debug)]
pub struct SuiteReport {
    pub suite: String,
    pub outcomes: Vec<CaseOutcome>,
}

impl SuiteReport {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(CaseOutcome::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.outcomes.iter().filter(|o| !o.passed())
    }

    pub fn outcome(&self, case: &str) -> Option<&CaseOutcome> {
        self.outcomes.iter().find(|o| o.name == case)
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.suite)?;
        for outcome in &self.outcomes {
            let millis = outcome.elapsed.as_millis();
            match &outcome.error {
                None if outcome.passed() => writeln!(f, "  ok      {} ({millis}ms)", outcome.name)?,
                None => writeln!(f, "  {:?} {} ({millis}ms)", outcome.state, outcome.name)?,
                Some(e) => writeln!(f, "  FAILED  {} ({millis}ms): {e}", outcome.name)?,
            }
        }
        Ok(())
    }
}

/// Runs suites against one renderer and baseline store.
///
/// The harness owns the document; every case starts and ends with an empty
/// root container and no listeners.
pub struct Harness {
    config: HarnessConfig,
    dom: Dom,
    barrier: Rc<ScreenshotBarrier>,
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::new()
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    /// Run every case of `suite` in order on a fresh `LocalSet`.
    ///
    /// Listener tasks a case leaves suspended are aborted by the reset that
    /// ends the case.
    pub async fn run(&self, suite: &Suite) -> SuiteReport {
        let span = info_span!("suite", suite = %suite.name(), cases = suite.len());
        LocalSet::new()
            .run_until(self.run_cases(suite).instrument(span))
            .await
    }

    /// Run `suite` on a new current-thread runtime.
    ///
    /// # Panics
    ///
    /// Panics when called from within an async runtime.
    pub fn run_blocking(&self, suite: &Suite) -> Result<SuiteReport, HarnessError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| HarnessError::Aborted(format!("failed to start runtime: {e}")))?;
        Ok(runtime.block_on(self.run(suite)))
    }

    async fn run_cases(&self, suite: &Suite) -> SuiteReport {
        let mut outcomes = Vec::with_capacity(suite.len());
        for case in suite.cases() {
            let span = info_span!("case", case = %case.name);
            let outcome = self.run_case(suite.name(), case).instrument(span).await;
            outcomes.push(outcome);
        }

        let report = SuiteReport {
            suite: suite.name().to_string(),
            outcomes,
        };
        let failed = report.failures().count();
        info!(
            passed = report.outcomes.len() - failed,
            failed, "Suite finished"
        );
        report
    }

    async fn run_case(&self, suite: &str, case: &Case) -> CaseOutcome {
        let started = Instant::now();
        self.dom.reset();

        let state = Rc::new(Cell::new(CaseState::Building));
        let crossings = Rc::new(Cell::new(0));
        let (done, completion) = Done::new(&case.name, Rc::clone(&state));

        let hook_done = done.downgrade();
        let hook_case = case.name.clone();
        self.dom.set_failure_hook(Some(Rc::new(move |failure: ListenerFailure| {
            match hook_done.upgrade() {
                Some(done) => {
                    done.fail(failure);
                }
                None => warn!(case = %hook_case, %failure, "Listener failed after case finished"),
            }
        })));

        let ctx = TestContext::new(
            suite,
            &case.name,
            self.dom.clone(),
            Rc::clone(&self.barrier),
            Rc::clone(&state),
            Rc::clone(&crossings),
        );
        let body = (case.body)(ctx, done.clone());
        let mode = case.completion;

        // `done` moves into the task: once the body and every listener
        // holding a clone are gone, the receiver closes.
        let task = tokio::task::spawn_local(async move {
            match AssertUnwindSafe(body).catch_unwind().await {
                Ok(Ok(())) => {
                    if mode == Completion::OnReturn {
                        done.complete();
                    }
                }
                Ok(Err(e)) => {
                    done.fail(e);
                }
                Err(payload) => {
                    done.fail(HarnessError::Panicked(panic_message(payload.as_ref())));
                }
            }
        });

        let timeout = self.config.case_timeout;
        let result = match tokio::time::timeout(timeout, completion).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                state.set(CaseState::Failed);
                Err(HarnessError::Aborted(
                    "case finished without signaling completion".into(),
                ))
            }
            Err(_) => {
                state.set(CaseState::TimedOut);
                Err(HarnessError::TimedOut(timeout))
            }
        };
        task.abort();
        self.dom.reset();

        let outcome = CaseOutcome {
            name: case.name.clone(),
            state: state.get(),
            error: result.err(),
            crossings: crossings.get(),
            elapsed: started.elapsed(),
        };
        match &outcome.error {
            None => info!(
                crossings = outcome.crossings,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "Case passed"
            ),
            Some(e) => warn!(state = ?outcome.state, error = %e, "Case failed"),
        }
        outcome
    }
}

/// Builder for [`Harness`].
pub struct HarnessBuilder {
    config: HarnessConfig,
    renderer: Option<Rc<dyn Renderer>>,
    baselines: Option<Rc<dyn BaselineStore>>,
    comparator: Option<Box<dyn Comparator>>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            config: HarnessConfig::default(),
            renderer: None,
            baselines: None,
            comparator: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: HarnessConfig) -> Self {
        self.config = config;
        self
    }

    /// The engine under test. Required.
    pub fn renderer(self, renderer: impl Renderer + 'static) -> Self {
        self.shared_renderer(Rc::new(renderer))
    }

    /// The engine under test, shared with the caller.
    pub fn shared_renderer(mut self, renderer: Rc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Baseline store. Defaults to [`DirectoryBaselines`] at
    /// [`HarnessConfig::baseline_dir`].
    pub fn baselines(mut self, baselines: Rc<dyn BaselineStore>) -> Self {
        self.baselines = Some(baselines);
        self
    }

    /// Comparison policy. Defaults to a [`ToleranceComparator`] built from
    /// the configured tolerances.
    pub fn comparator(mut self, comparator: impl Comparator + 'static) -> Self {
        self.comparator = Some(Box::new(comparator));
        self
    }

    pub fn update_baselines(mut self, update: bool) -> Self {
        self.config.update_baselines = update;
        self
    }

    pub fn case_timeout(mut self, timeout: Duration) -> Self {
        self.config.case_timeout = timeout;
        self
    }

    pub fn artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.artifact_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> Result<Harness, HarnessError> {
        self.config.validate()?;
        let renderer = self
            .renderer
            .ok_or_else(|| HarnessError::Config("no renderer configured".into()))?;
        let config = self.config;

        let baselines = self
            .baselines
            .unwrap_or_else(|| {
                Rc::new(DirectoryBaselines::new(config.baseline_dir.clone())) as Rc<dyn BaselineStore>
            });
        let comparator = self.comparator.unwrap_or_else(|| {
            Box::new(ToleranceComparator::new(
                config.channel_tolerance,
                config.max_diff_pixels,
            )) as Box<dyn Comparator>
        });

        let barrier = ScreenshotBarrier::new(renderer, baselines)
            .with_comparator(comparator)
            .with_viewport(config.viewport)
            .update_baselines(config.update_baselines)
            .with_artifact_dir(config.artifact_dir.clone());

        info!(
            baseline_dir = %config.baseline_dir.display(),
            update_baselines = config.update_baselines,
            timeout_ms = config.case_timeout.as_millis() as u64,
            "Harness ready"
        );

        Ok(Harness {
            config,
            dom: Dom::new(),
            barrier: Rc::new(barrier),
        })
    }
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self::new()
    }
}
