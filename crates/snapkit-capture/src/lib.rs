//! # SnapKit Capture
//!
//! Everything between "the tree is ready" and "the test may continue":
//! asking the renderer for a frame, finding the recorded baseline and
//! deciding whether the two match.
//!
//! ## Modules
//!
//! - [`frame`]: pixel frames, PPM encoding, pixel comparison and diff images
//! - [`renderer`]: the [`Renderer`] collaborator trait and [`Viewport`]
//! - [`baseline`]: [`SnapshotKey`] and the [`BaselineStore`] implementations
//! - [`compare`]: the [`Comparator`] policy trait
//! - [`barrier`]: the [`ScreenshotBarrier`] itself

pub mod barrier;
pub mod baseline;
pub mod compare;
pub mod frame;
pub mod renderer;

pub use barrier::{BarrierError, BarrierOutcome, MismatchError, ScreenshotBarrier};
pub use baseline::{BaselineMetadata, BaselineStore, DirectoryBaselines, MemoryBaselines, SnapshotKey};
pub use compare::{Comparator, Comparison, ToleranceComparator};
pub use frame::{Frame, FrameDiff, Rgb};
pub use renderer::{Renderer, Viewport};

use thiserror::Error;

/// Error type for capture and baseline operations.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid frame data: {0}")]
    InvalidFormat(String),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}
