//! Harness configuration.
//!
//! Values come from [`HarnessConfig::default`], optionally a JSON file, and
//! finally `SNAPKIT_*` environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use snapkit_capture::Viewport;

use crate::HarnessError;

/// Overrides [`HarnessConfig::baseline_dir`].
pub const ENV_BASELINE_DIR: &str = "SNAPKIT_BASELINE_DIR";
/// Overrides [`HarnessConfig::artifact_dir`].
pub const ENV_ARTIFACT_DIR: &str = "SNAPKIT_ARTIFACT_DIR";
/// Overrides [`HarnessConfig::update_baselines`].
pub const ENV_UPDATE_BASELINES: &str = "SNAPKIT_UPDATE_BASELINES";
/// Overrides [`HarnessConfig::case_timeout`], in milliseconds.
pub const ENV_CASE_TIMEOUT_MS: &str = "SNAPKIT_CASE_TIMEOUT_MS";

/// Settings shared by every case a [`Harness`](crate::Harness) runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Root of the on-disk baseline store.
    pub baseline_dir: PathBuf,

    /// Where `actual` and `diff` frames go on mismatch. Nothing is written
    /// when unset.
    pub artifact_dir: Option<PathBuf>,

    /// Record every capture as the new baseline.
    pub update_baselines: bool,

    pub viewport: Viewport,

    /// Largest per-channel difference still treated as equal.
    pub channel_tolerance: u8,

    /// Differing pixels allowed before a capture mismatches.
    pub max_diff_pixels: usize,

    /// Upper bound on a single case, from reset to completion signal.
    #[serde(rename = "case_timeout_ms", with = "millis")]
    pub case_timeout: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            baseline_dir: PathBuf::from("snapshots"),
            artifact_dir: None,
            update_baselines: false,
            viewport: Viewport::default(),
            channel_tolerance: 0,
            max_diff_pixels: 0,
            case_timeout: Duration::from_millis(10_000),
        }
    }
}

impl HarnessConfig {
    /// Parse a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, HarnessError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| HarnessError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| HarnessError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Apply `SNAPKIT_*` overrides from the process environment.
    pub fn apply_env(self) -> Result<Self, HarnessError> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Apply `SNAPKIT_*` overrides using `lookup` for variable access.
    pub fn apply_env_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, HarnessError> {
        if let Some(dir) = lookup(ENV_BASELINE_DIR) {
            self.baseline_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(ENV_ARTIFACT_DIR) {
            self.artifact_dir = (!dir.is_empty()).then(|| PathBuf::from(dir));
        }
        if let Some(value) = lookup(ENV_UPDATE_BASELINES) {
            self.update_baselines = parse_flag(ENV_UPDATE_BASELINES, &value)?;
        }
        if let Some(value) = lookup(ENV_CASE_TIMEOUT_MS) {
            let ms: u64 = value.trim().parse().map_err(|_| {
                HarnessError::Config(format!("{ENV_CASE_TIMEOUT_MS}: not a number: {value:?}"))
            })?;
            self.case_timeout = Duration::from_millis(ms);
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject settings no case could run under.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.case_timeout.is_zero() {
            return Err(HarnessError::Config("case timeout must be non-zero".into()));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(HarnessError::Config(format!(
                "viewport must be non-empty, got {}x{}",
                self.viewport.width, self.viewport.height
            )));
        }
        Ok(())
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, HarnessError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(HarnessError::Config(format!(
            "{name}: expected a boolean, got {value:?}"
        ))),
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
