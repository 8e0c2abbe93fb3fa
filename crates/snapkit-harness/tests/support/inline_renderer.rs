//! A deterministic painter for the root container.
//!
//! Every `div` starts a new line; `span` and text flow inline. Each visible
//! character paints one pixel in the text color, spaces paint the block's
//! background, and a `border-left`/`border-right` paints one yellow pixel on
//! that side of the block.

use std::cell::Cell;
use std::time::Duration;

use async_trait::async_trait;
use snapkit_capture::{CaptureError, Frame, Renderer, Rgb, Viewport};
use snapkit_dom::{Document, Dom, DomError, NodeId, NodeKind};

pub const FUCHSIA: Rgb = Rgb::new(255, 0, 255);
pub const YELLOW: Rgb = Rgb::new(255, 255, 0);

pub struct InlineRenderer {
    captures: Cell<u32>,
}

impl InlineRenderer {
    pub fn new() -> Self {
        Self {
            captures: Cell::new(0),
        }
    }

    /// Frames produced so far.
    pub fn captures(&self) -> u32 {
        self.captures.get()
    }
}

#[async_trait(?Send)]
impl Renderer for InlineRenderer {
    async fn capture(&self, dom: &Dom, viewport: Viewport) -> Result<Frame, CaptureError> {
        self.captures.set(self.captures.get() + 1);

        let mut frame = Frame::new(viewport.width, viewport.height, Rgb::WHITE);
        let mut pen = Pen::default();
        dom.read(|doc| paint(doc, doc.body(), &mut frame, &mut pen, Rgb::WHITE))
            .map_err(|e| CaptureError::Render(e.to_string()))?;
        Ok(frame)
    }
}

#[derive(Default)]
struct Pen {
    x: u32,
    y: u32,
}

impl Pen {
    fn newline(&mut self) {
        if self.x > 0 {
            self.x = 0;
            self.y += 1;
        }
    }

    fn put(&mut self, frame: &mut Frame, color: Rgb) {
        if self.x >= frame.width {
            self.newline();
        }
        frame.set_pixel(self.x, self.y, color);
        self.x += 1;
    }
}

fn paint(
    doc: &Document,
    node: NodeId,
    frame: &mut Frame,
    pen: &mut Pen,
    background: Rgb,
) -> Result<(), DomError> {
    let data = doc.node(node)?;
    match &data.kind {
        NodeKind::Text(text) => {
            for ch in text.chars() {
                let color = if ch.is_whitespace() { background } else { Rgb::BLACK };
                pen.put(frame, color);
            }
        }
        NodeKind::Comment(_) => {}
        NodeKind::Element { tag, style } => {
            let block = &**tag != "span";
            let background = match style.get("background-color") {
                Some("fuchsia") => FUCHSIA,
                _ => background,
            };

            if block {
                pen.newline();
            }
            if style.get("border-left").is_some() {
                pen.put(frame, YELLOW);
            }
            for &child in data.children() {
                paint(doc, child, frame, pen, background)?;
            }
            if style.get("border-right").is_some() {
                pen.put(frame, YELLOW);
            }
            if block {
                pen.newline();
            }
        }
    }
    Ok(())
}

/// An [`InlineRenderer`] that waits before it looks at the tree.
pub struct SlowRenderer {
    delay: Duration,
    inner: InlineRenderer,
}

impl SlowRenderer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: InlineRenderer::new(),
        }
    }
}

#[async_trait(?Send)]
impl Renderer for SlowRenderer {
    async fn capture(&self, dom: &Dom, viewport: Viewport) -> Result<Frame, CaptureError> {
        tokio::time::sleep(self.delay).await;
        self.inner.capture(dom, viewport).await
    }
}
