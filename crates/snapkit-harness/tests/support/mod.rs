//! Test support utilities for SnapKit integration tests
//!
//! - InlineRenderer: a tiny block/inline painter standing in for the engine
//! - scenarios: the delete-block-in-inlines case bodies
//! - Assertions: custom test assertions

mod assertions;
mod inline_renderer;
pub mod scenarios;

pub use assertions::*;
pub use inline_renderer::{InlineRenderer, SlowRenderer, FUCHSIA, YELLOW};

use std::rc::Rc;
use std::time::Duration;

use snapkit_capture::{BaselineStore, MemoryBaselines, Viewport};
use snapkit_harness::{Harness, HarnessConfig};

/// Viewport used by every integration test.
pub const VIEWPORT: Viewport = Viewport {
    width: 64,
    height: 8,
};

pub fn test_config() -> HarnessConfig {
    HarnessConfig {
        viewport: VIEWPORT,
        case_timeout: Duration::from_secs(5),
        ..HarnessConfig::default()
    }
}

/// A harness over `baselines` with a fresh [`InlineRenderer`].
pub fn harness_with(baselines: Rc<MemoryBaselines>, config: HarnessConfig) -> (Harness, Rc<InlineRenderer>) {
    snapkit_harness::logging::init();
    let renderer = Rc::new(InlineRenderer::new());
    let harness = Harness::builder()
        .config(config)
        .shared_renderer(renderer.clone())
        .baselines(baselines as Rc<dyn BaselineStore>)
        .build()
        .expect("harness should build");
    (harness, renderer)
}
