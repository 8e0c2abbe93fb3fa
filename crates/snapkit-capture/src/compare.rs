//! Baseline comparison policy.

use crate::frame::{Frame, FrameDiff};

/// Result of comparing a capture against its baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub matched: bool,
    pub diff: FrameDiff,
}

/// Decides whether a capture matches its baseline.
pub trait Comparator {
    fn compare(&self, expected: &Frame, actual: &Frame) -> Comparison;

    /// Image highlighting where `actual` departs from `expected`.
    fn diff_image(&self, expected: &Frame, actual: &Frame) -> Frame {
        expected.diff_image(actual, 0)
    }
}

impl<C: Comparator + ?Sized> Comparator for Box<C> {
    fn compare(&self, expected: &Frame, actual: &Frame) -> Comparison {
        (**self).compare(expected, actual)
    }

    fn diff_image(&self, expected: &Frame, actual: &Frame) -> Frame {
        (**self).diff_image(expected, actual)
    }
}

/// Per-channel tolerance with an allowance of differing pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToleranceComparator {
    /// Largest per-channel difference still treated as equal.
    pub channel_tolerance: u8,
    /// Number of differing pixels allowed before the frames mismatch.
    pub max_diff_pixels: usize,
}

impl ToleranceComparator {
    /// Pixel-exact comparison.
    pub fn exact() -> Self {
        Self::default()
    }

    pub fn new(channel_tolerance: u8, max_diff_pixels: usize) -> Self {
        Self {
            channel_tolerance,
            max_diff_pixels,
        }
    }
}

impl Comparator for ToleranceComparator {
    fn compare(&self, expected: &Frame, actual: &Frame) -> Comparison {
        let diff = expected.compare(actual, self.channel_tolerance);
        Comparison {
            matched: !diff.size_mismatch && diff.diff_pixels <= self.max_diff_pixels,
            diff,
        }
    }

    fn diff_image(&self, expected: &Frame, actual: &Frame) -> Frame {
        expected.diff_image(actual, self.channel_tolerance)
    }
}
