//! The delete-block-in-inlines suite, end to end.

use std::rc::Rc;

use snapkit_capture::{MemoryBaselines, SnapshotKey};
use snapkit_harness::CaseState;

use crate::support::scenarios::{delete_block_suite, Position, Observed, RUN_TEXT, SUITE};
use crate::support::{
    assert_case_state, assert_suite_passed, harness_with, test_config, FUCHSIA, YELLOW,
};

const POSITIONS: [Position; 3] = [Position::Beginning, Position::Middle, Position::End];

fn key(position: Position, index: u32) -> SnapshotKey {
    SnapshotKey::new(SUITE, position.case_name(), index)
}

#[tokio::test]
async fn test_first_run_records_two_baselines_per_case() {
    let baselines = Rc::new(MemoryBaselines::new());
    let (harness, renderer) = harness_with(baselines.clone(), test_config());
    let observed = Observed::default();

    let report = harness.run(&delete_block_suite(&observed)).await;

    assert_suite_passed(&report);
    assert_eq!(
        report.outcomes.iter().map(|o| o.name.as_str()).collect::<Vec<_>>(),
        vec!["beginning-001", "end-001", "middle-001"]
    );
    for outcome in &report.outcomes {
        assert_eq!(outcome.state, CaseState::Completed);
        assert_eq!(outcome.crossings, 2);
    }
    assert_eq!(baselines.len(), 6);
    assert_eq!(renderer.captures(), 6);
    for position in POSITIONS {
        assert!(baselines.get(&key(position, 1)).is_some());
        assert!(baselines.get(&key(position, 2)).is_some());
    }
}

#[tokio::test]
async fn test_block_removed_and_inlines_kept_in_order() {
    let baselines = Rc::new(MemoryBaselines::new());
    let (harness, _renderer) = harness_with(baselines, test_config());
    let observed = Observed::default();

    let report = harness.run(&delete_block_suite(&observed)).await;
    assert_suite_passed(&report);

    let observations = observed.borrow();
    assert_eq!(observations.len(), 3);
    for seen in observations.iter() {
        assert_eq!(seen.children, seen.inline_run, "{}", seen.case);
        assert_eq!(seen.text, RUN_TEXT, "{}", seen.case);
        assert!(!seen.block_connected, "{}", seen.case);
        assert_eq!(seen.click_listeners, 0, "{}", seen.case);
        assert!(!seen.markup.contains("block to remove"), "{}", seen.case);
    }
}

#[tokio::test]
async fn test_removed_block_keeps_its_subtree() {
    let (harness, _renderer) = harness_with(Rc::new(MemoryBaselines::new()), test_config());
    let observed = Observed::default();

    harness.run(&delete_block_suite(&observed)).await;

    for seen in observed.borrow().iter() {
        assert_eq!(
            seen.block_markup,
            "<div style=\"border-left: 5px solid yellow; border-right: 5px solid yellow; margin: 10px 0\">block to remove</div>"
        );
    }
}

#[tokio::test]
async fn test_all_positions_converge_on_the_same_tree() {
    let baselines = Rc::new(MemoryBaselines::new());
    let (harness, _renderer) = harness_with(baselines.clone(), test_config());
    let observed = Observed::default();

    harness.run(&delete_block_suite(&observed)).await;

    let markups: Vec<_> = observed.borrow().iter().map(|o| o.markup.clone()).collect();
    assert_eq!(markups.len(), 3);
    assert!(markups.iter().all(|m| m == &markups[0]));
    assert_eq!(
        markups[0],
        "<body>\
         <div style=\"background-color: fuchsia; color: black; font: 20px; margin: 10px\">\
         <span>Several</span><span>inline elements</span> are <span>in this</span> sentence.\
         </div>\
         <div style=\"background-color: fuchsia; color: black; font: 20px; margin: 10px\">\
         Several inline elements are in this sentence.\
         </div>\
         </body>"
    );

    let after = baselines.get(&key(Position::Beginning, 2)).unwrap();
    for position in POSITIONS {
        let before = baselines.get(&key(position, 1)).unwrap();
        assert_ne!(before, after, "{position:?} should change on click");
        assert_eq!(baselines.get(&key(position, 2)).unwrap(), after);
    }
}

#[tokio::test]
async fn test_initial_capture_shows_the_block() {
    let baselines = Rc::new(MemoryBaselines::new());
    let (harness, _renderer) = harness_with(baselines.clone(), test_config());

    harness.run(&delete_block_suite(&Observed::default())).await;

    // Beginning: the block owns the first line, bordered on both sides.
    let before = baselines.get(&key(Position::Beginning, 1)).unwrap();
    assert_eq!(before.sample_pixel(0, 0), YELLOW);
    assert_eq!(before.sample_pixel(16, 0), YELLOW);

    // Afterwards the inline run starts the first line.
    let after = baselines.get(&key(Position::Beginning, 2)).unwrap();
    assert_ne!(after.sample_pixel(0, 0), YELLOW);
    // The space in "inline elements" shows the container background.
    assert_eq!(after.sample_pixel(13, 0), FUCHSIA);
}

#[tokio::test]
async fn test_second_run_matches_recorded_baselines() {
    let baselines = Rc::new(MemoryBaselines::new());
    let observed = Observed::default();

    let (first, _) = harness_with(baselines.clone(), test_config());
    assert_suite_passed(&first.run(&delete_block_suite(&observed)).await);

    let (second, renderer) = harness_with(baselines.clone(), test_config());
    let report = second.run(&delete_block_suite(&observed)).await;

    assert_suite_passed(&report);
    assert_eq!(renderer.captures(), 6);
    assert_eq!(baselines.len(), 6);
    for position in POSITIONS {
        assert_case_state(&report, position.case_name(), CaseState::Completed);
    }
}
