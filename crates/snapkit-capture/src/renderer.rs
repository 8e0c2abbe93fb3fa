//! The rendering collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use snapkit_dom::Dom;

use crate::frame::Frame;
use crate::CaptureError;

/// Capture size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

/// The engine under test, as seen by the harness.
///
/// Implementations observe the document's root container and produce a
/// frame reflecting the tree at the time of the call. Layout and painting
/// are entirely the implementation's business.
#[async_trait(?Send)]
pub trait Renderer {
    async fn capture(&self, dom: &Dom, viewport: Viewport) -> Result<Frame, CaptureError>;
}
