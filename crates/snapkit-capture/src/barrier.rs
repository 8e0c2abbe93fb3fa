//! The screenshot barrier: render, look up the baseline, compare.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use snapkit_dom::Dom;
use thiserror::Error;
use tracing::{debug, info, warn, Instrument};

use crate::baseline::{BaselineStore, SnapshotKey};
use crate::compare::{Comparator, ToleranceComparator};
use crate::frame::Frame;
use crate::renderer::{Renderer, Viewport};
use crate::CaptureError;

/// A capture that did not match its baseline.
#[derive(Debug, Error)]
#[error("Screenshot mismatch for {key}: {diff_pixels} of {total_pixels} pixels differ")]
pub struct MismatchError {
    pub key: SnapshotKey,
    pub expected: Frame,
    pub actual: Frame,
    pub diff: Frame,
    pub diff_pixels: usize,
    pub total_pixels: usize,
    pub size_mismatch: bool,
}

/// Why a barrier crossing failed.
#[derive(Debug, Error)]
pub enum BarrierError {
    #[error(transparent)]
    Mismatch(#[from] MismatchError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// The document was reset while the crossing was in flight; nothing was
    /// compared or stored.
    #[error("Document was reset while capturing {0}")]
    Interrupted(SnapshotKey),
}

/// How a successful crossing resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierOutcome {
    /// The capture matched the recorded baseline.
    Matched { diff_pixels: usize },
    /// No baseline existed (or update mode is on); the capture was recorded.
    Recorded,
}

/// Requests a capture of the current tree and compares it against the
/// baseline for a snapshot key.
pub struct ScreenshotBarrier {
    renderer: Rc<dyn Renderer>,
    baselines: Rc<dyn BaselineStore>,
    comparator: Box<dyn Comparator>,
    viewport: Viewport,
    update_baselines: bool,
    artifact_dir: Option<PathBuf>,
}

impl ScreenshotBarrier {
    /// Pixel-exact barrier with the default viewport.
    pub fn new(renderer: Rc<dyn Renderer>, baselines: Rc<dyn BaselineStore>) -> Self {
        Self {
            renderer,
            baselines,
            comparator: Box::new(ToleranceComparator::exact()),
            viewport: Viewport::default(),
            update_baselines: false,
            artifact_dir: None,
        }
    }

    pub fn with_comparator(mut self, comparator: impl Comparator + 'static) -> Self {
        self.comparator = Box::new(comparator);
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// Record every capture as the new baseline instead of comparing.
    pub fn update_baselines(mut self, update: bool) -> Self {
        self.update_baselines = update;
        self
    }

    /// Directory that receives `actual` and `diff` frames on mismatch.
    pub fn with_artifact_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.artifact_dir = dir;
        self
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Cross the barrier once for `key`.
    pub async fn match_screenshot(
        &self,
        dom: &Dom,
        key: &SnapshotKey,
    ) -> Result<BarrierOutcome, BarrierError> {
        let span = tracing::info_span!("match_screenshot", %key);
        self.cross(dom, key).instrument(span).await
    }

    async fn cross(&self, dom: &Dom, key: &SnapshotKey) -> Result<BarrierOutcome, BarrierError> {
        let generation = dom.read(|doc| doc.generation());

        // Let pending listener work settle before the renderer looks.
        tokio::task::yield_now().await;

        let actual = self.renderer.capture(dom, self.viewport).await?;
        if dom.read(|doc| doc.generation()) != generation {
            warn!("Document reset during capture, frame discarded");
            return Err(BarrierError::Interrupted(key.clone()));
        }
        debug!(width = actual.width, height = actual.height, "Frame captured");

        if self.update_baselines {
            self.baselines.store(key, &actual)?;
            info!("Baseline updated");
            return Ok(BarrierOutcome::Recorded);
        }

        let Some(expected) = self.baselines.load(key)? else {
            self.baselines.store(key, &actual)?;
            info!("No baseline found, recorded capture");
            return Ok(BarrierOutcome::Recorded);
        };

        let comparison = self.comparator.compare(&expected, &actual);
        if comparison.matched {
            debug!(diff_pixels = comparison.diff.diff_pixels, "Screenshot matched");
            return Ok(BarrierOutcome::Matched {
                diff_pixels: comparison.diff.diff_pixels,
            });
        }

        warn!(
            diff_pixels = comparison.diff.diff_pixels,
            diff_percent = comparison.diff.diff_percent,
            size_mismatch = comparison.diff.size_mismatch,
            "Screenshot mismatch"
        );
        let diff = self.comparator.diff_image(&expected, &actual);
        let mismatch = MismatchError {
            key: key.clone(),
            expected,
            actual,
            diff,
            diff_pixels: comparison.diff.diff_pixels,
            total_pixels: comparison.diff.total_pixels,
            size_mismatch: comparison.diff.size_mismatch,
        };
        if let Some(dir) = &self.artifact_dir {
            if let Err(e) = write_artifacts(dir, &mismatch) {
                warn!(error = %e, dir = %dir.display(), "Failed to write mismatch artifacts");
            }
        }
        Err(mismatch.into())
    }
}

fn write_artifacts(dir: &Path, mismatch: &MismatchError) -> Result<(), CaptureError> {
    let actual = dir.join(mismatch.key.relative_path("actual.ppm"));
    if let Some(parent) = actual.parent() {
        std::fs::create_dir_all(parent)?;
    }
    mismatch.actual.save_ppm(&actual)?;
    mismatch
        .diff
        .save_ppm(dir.join(mismatch.key.relative_path("diff.ppm")))?;
    info!(path = %actual.display(), "Mismatch artifacts written");
    Ok(())
}
