//! Baseline storage keyed by snapshot identity.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::frame::Frame;
use crate::CaptureError;

/// Identity of one barrier crossing: suite, case and the 1-based crossing
/// number within the case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotKey {
    pub suite: String,
    pub case: String,
    pub index: u32,
}

impl SnapshotKey {
    pub fn new(suite: impl Into<String>, case: impl Into<String>, index: u32) -> Self {
        Self {
            suite: suite.into(),
            case: case.into(),
            index,
        }
    }

    /// Relative path `<suite>/<case>.<index>.<extension>`. Bytes outside
    /// `[A-Za-z0-9_-]` are percent-escaped, so distinct keys never share a
    /// file.
    pub fn relative_path(&self, extension: &str) -> PathBuf {
        Path::new(&escape(&self.suite)).join(format!(
            "{}.{}.{}",
            escape(&self.case),
            self.index,
            extension
        ))
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.suite, self.case, self.index)
    }
}

fn escape(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for byte in part.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Where baselines are looked up and recorded.
pub trait BaselineStore {
    fn load(&self, key: &SnapshotKey) -> Result<Option<Frame>, CaptureError>;

    fn store(&self, key: &SnapshotKey, frame: &Frame) -> Result<(), CaptureError>;
}

/// In-memory baselines, for tests and dry runs.
#[derive(Default)]
pub struct MemoryBaselines {
    frames: RefCell<HashMap<SnapshotKey, Frame>>,
}

impl MemoryBaselines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.borrow().is_empty()
    }

    /// Recorded keys, sorted.
    pub fn keys(&self) -> Vec<SnapshotKey> {
        let mut keys: Vec<_> = self.frames.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn get(&self, key: &SnapshotKey) -> Option<Frame> {
        self.frames.borrow().get(key).cloned()
    }
}

impl BaselineStore for MemoryBaselines {
    fn load(&self, key: &SnapshotKey) -> Result<Option<Frame>, CaptureError> {
        Ok(self.get(key))
    }

    fn store(&self, key: &SnapshotKey, frame: &Frame) -> Result<(), CaptureError> {
        self.frames.borrow_mut().insert(key.clone(), frame.clone());
        Ok(())
    }
}

/// Sidecar written next to every baseline on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineMetadata {
    pub key: String,
    pub width: u32,
    pub height: u32,
    /// Seconds since the Unix epoch.
    pub recorded_at: u64,
}

/// Baselines stored as `<root>/<suite>/<case>.<index>.ppm` with a JSON
/// metadata sidecar.
#[derive(Debug, Clone)]
pub struct DirectoryBaselines {
    root: PathBuf,
}

impl DirectoryBaselines {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        info!(root = %root.display(), "Directory baselines initialized");
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn frame_path(&self, key: &SnapshotKey) -> PathBuf {
        self.root.join(key.relative_path("ppm"))
    }

    pub fn metadata_path(&self, key: &SnapshotKey) -> PathBuf {
        self.root.join(key.relative_path("json"))
    }

    /// Read the sidecar for `key`, if recorded.
    pub fn metadata(&self, key: &SnapshotKey) -> Result<Option<BaselineMetadata>, CaptureError> {
        let path = self.metadata_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }
}

impl BaselineStore for DirectoryBaselines {
    fn load(&self, key: &SnapshotKey) -> Result<Option<Frame>, CaptureError> {
        let path = self.frame_path(key);
        if !path.exists() {
            debug!(%key, path = %path.display(), "No baseline on disk");
            return Ok(None);
        }
        Frame::load_ppm(&path).map(Some)
    }

    fn store(&self, key: &SnapshotKey, frame: &Frame) -> Result<(), CaptureError> {
        let path = self.frame_path(key);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        frame.save_ppm(&path)?;

        let metadata = BaselineMetadata {
            key: key.to_string(),
            width: frame.width,
            height: frame.height,
            recorded_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        };
        fs::write(
            self.metadata_path(key),
            serde_json::to_string_pretty(&metadata)?,
        )?;

        info!(%key, path = %path.display(), "Baseline recorded");
        Ok(())
    }
}
