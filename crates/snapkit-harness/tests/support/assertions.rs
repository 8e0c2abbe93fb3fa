//! Custom assertions for integration tests.

use snapkit_harness::{CaseState, HarnessError, SuiteReport};

/// Assert that every case of a suite passed.
#[track_caller]
pub fn assert_suite_passed(report: &SuiteReport) {
    assert!(report.passed(), "Suite should pass:\n{report}");
}

/// Assert the terminal state of one case.
#[track_caller]
pub fn assert_case_state(report: &SuiteReport, case: &str, expected: CaseState) {
    let outcome = report
        .outcome(case)
        .unwrap_or_else(|| panic!("No outcome for case '{case}':\n{report}"));
    assert_eq!(
        outcome.state, expected,
        "Case '{case}' ended {:?}, expected {expected:?}:\n{report}",
        outcome.state
    );
}

/// The error a case failed with.
#[track_caller]
pub fn case_error<'a>(report: &'a SuiteReport, case: &str) -> &'a HarnessError {
    report
        .outcome(case)
        .and_then(|o| o.error.as_ref())
        .unwrap_or_else(|| panic!("Case '{case}' should have failed:\n{report}"))
}
