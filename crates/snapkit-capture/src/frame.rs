//! Captured frames: pixel storage, PPM encoding and pixel comparison.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::CaptureError;

/// RGB color value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const RED: Rgb = Rgb::new(255, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Check if every channel is within `tolerance` of `other`.
    pub fn near(self, other: Rgb, tolerance: u8) -> bool {
        self.r.abs_diff(other.r) <= tolerance
            && self.g.abs_diff(other.g) <= tolerance
            && self.b.abs_diff(other.b) <= tolerance
    }

    fn dimmed(self) -> Self {
        Self::new(self.r / 2, self.g / 2, self.b / 2)
    }
}

/// A rendered frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pixels: Vec<Rgb>,
}

/// Frame comparison result.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameDiff {
    pub size_mismatch: bool,
    pub diff_pixels: usize,
    pub total_pixels: usize,
    pub diff_percent: f64,
}

impl Frame {
    /// A frame filled with a single color.
    pub fn new(width: u32, height: u32, fill: Rgb) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; (width as usize) * (height as usize)],
        }
    }

    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Rgb>) -> Result<Self, CaptureError> {
        let expected = (width as usize) * (height as usize);
        if pixels.len() != expected {
            return Err(CaptureError::InvalidFormat(format!(
                "{}x{} frame needs {} pixels, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build from RGBA bytes (alpha is dropped).
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> Result<Self, CaptureError> {
        let pixels = rgba
            .chunks_exact(4)
            .map(|c| Rgb::new(c[0], c[1], c[2]))
            .collect();
        Self::from_pixels(width, height, pixels)
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    /// Sample a pixel at (x, y). Out-of-bounds reads are black.
    pub fn sample_pixel(&self, x: u32, y: u32) -> Rgb {
        self.index(x, y).map_or(Rgb::BLACK, |i| self.pixels[i])
    }

    /// Set a pixel; out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgb) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    /// Check if frame is blank (all pixels same color).
    pub fn is_blank(&self) -> bool {
        match self.pixels.first() {
            Some(first) => self.pixels.iter().all(|p| p == first),
            None => true,
        }
    }

    /// Compare this frame with another.
    pub fn compare(&self, other: &Frame, tolerance: u8) -> FrameDiff {
        if self.width != other.width || self.height != other.height {
            let total = self.pixels.len().max(other.pixels.len());
            return FrameDiff {
                size_mismatch: true,
                diff_pixels: total,
                total_pixels: total,
                diff_percent: 100.0,
            };
        }

        let total = self.pixels.len();
        let diff_count = self
            .pixels
            .iter()
            .zip(&other.pixels)
            .filter(|(a, b)| !a.near(**b, tolerance))
            .count();

        FrameDiff {
            size_mismatch: false,
            diff_pixels: diff_count,
            total_pixels: total,
            diff_percent: if total == 0 {
                0.0
            } else {
                (diff_count as f64 / total as f64) * 100.0
            },
        }
    }

    /// Generate a diff image: differing pixels in red, the rest dimmed.
    ///
    /// Frames of different sizes produce a solid red frame covering both.
    pub fn diff_image(&self, actual: &Frame, tolerance: u8) -> Frame {
        if self.width != actual.width || self.height != actual.height {
            return Frame::new(
                self.width.max(actual.width),
                self.height.max(actual.height),
                Rgb::RED,
            );
        }

        let pixels = self
            .pixels
            .iter()
            .zip(&actual.pixels)
            .map(|(e, a)| if e.near(*a, tolerance) { a.dimmed() } else { Rgb::RED })
            .collect();

        Frame {
            width: self.width,
            height: self.height,
            pixels,
        }
    }

    /// Encode as binary PPM (P6).
    pub fn to_ppm(&self) -> Vec<u8> {
        let header = format!("P6\n{} {}\n255\n", self.width, self.height);
        let mut out = Vec::with_capacity(header.len() + self.pixels.len() * 3);
        out.extend_from_slice(header.as_bytes());
        for p in &self.pixels {
            out.extend_from_slice(&[p.r, p.g, p.b]);
        }
        out
    }

    /// Save as PPM.
    pub fn save_ppm(&self, path: impl AsRef<Path>) -> Result<(), CaptureError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&self.to_ppm())?;
        writer.flush()?;
        Ok(())
    }

    /// Load frame from PPM file.
    pub fn load_ppm(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let content = std::fs::read(path.as_ref())?;
        Self::from_ppm(&content)
    }

    /// Decode binary PPM (P6, maxval 255). Comments in the header are
    /// skipped.
    pub fn from_ppm(content: &[u8]) -> Result<Self, CaptureError> {
        let mut pos = 0;
        let mut fields = Vec::with_capacity(4);

        while fields.len() < 4 {
            while pos < content.len() && content[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if pos < content.len() && content[pos] == b'#' {
                while pos < content.len() && content[pos] != b'\n' {
                    pos += 1;
                }
                continue;
            }
            let start = pos;
            while pos < content.len() && !content[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if start == pos {
                return Err(CaptureError::InvalidFormat("truncated PPM header".into()));
            }
            fields.push(&content[start..pos]);
        }
        // Exactly one whitespace byte separates the header from pixel data.
        pos += 1;

        if fields[0] != b"P6" {
            return Err(CaptureError::InvalidFormat(format!(
                "invalid PPM magic: {:?}",
                String::from_utf8_lossy(fields[0])
            )));
        }
        let number = |field: &[u8], what: &str| -> Result<u32, CaptureError> {
            std::str::from_utf8(field)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| CaptureError::InvalidFormat(format!("invalid {}", what)))
        };
        let width = number(fields[1], "width")?;
        let height = number(fields[2], "height")?;
        if number(fields[3], "max value")? != 255 {
            return Err(CaptureError::InvalidFormat(
                "only 8-bit PPM is supported".into(),
            ));
        }

        let data = content.get(pos..).unwrap_or_default();
        let pixels = data
            .chunks_exact(3)
            .map(|c| Rgb::new(c[0], c[1], c[2]))
            .collect();
        Self::from_pixels(width, height, pixels)
    }
}
