use crate::camera::{MAX_SCALE, MIN_SCALE};
use crate::error::ViewerError;
use crate::selection::DEFAULT_CLICK_THRESHOLD;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Listing cap used when the config does not set one.
pub const DEFAULT_MAX_CHUNKS: usize = 100_000;

/// Shortest accepted stats polling interval, seconds.
pub const MIN_STATS_REFRESH_SECS: f64 = 0.5;

/// Viewer settings, read from a JSON file. Every field is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewerConfig {
    /// Directory with one sub-directory per save
    #[serde(default = "default_saves_root")]
    pub saves_root: PathBuf,
    /// Where pre-delete backups go
    #[serde(default = "default_backup_root")]
    pub backup_root: PathBuf,
    /// Base of `{base}/map_{tx}_{ty}.png`
    #[serde(default = "default_tile_base_url")]
    pub tile_base_url: String,
    /// World units per background tile edge
    #[serde(default = "default_tile_span")]
    pub tile_span: i32,
    /// Screen padding used when fitting the map
    #[serde(default = "default_fit_padding")]
    pub fit_padding: f32,
    /// Lower zoom clamp, pixels per chunk
    #[serde(default = "default_min_scale")]
    pub min_scale: f32,
    /// Upper zoom clamp, pixels per chunk
    #[serde(default = "default_max_scale")]
    pub max_scale: f32,
    /// Drags smaller than this (world units, both axes) are clicks
    #[serde(default = "default_click_threshold")]
    pub click_threshold: f32,
    /// Zoom factor per wheel notch
    #[serde(default = "default_wheel_zoom_step")]
    pub wheel_zoom_step: f32,
    /// Most chunks a listing may return
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
    /// File-name prefixes that mark chunk files
    #[serde(default = "default_chunk_prefixes")]
    pub chunk_prefixes: Vec<String>,
    /// Seconds between background stats refreshes
    #[serde(default = "default_stats_refresh_secs")]
    pub stats_refresh_secs: f64,
}

fn default_saves_root() -> PathBuf {
    PathBuf::from("saves")
}
fn default_backup_root() -> PathBuf {
    PathBuf::from("backups")
}
fn default_tile_base_url() -> String {
    "tiles".to_owned()
}
fn default_tile_span() -> i32 {
    32
}
fn default_fit_padding() -> f32 {
    40.0
}
fn default_min_scale() -> f32 {
    MIN_SCALE
}
fn default_max_scale() -> f32 {
    MAX_SCALE
}
fn default_click_threshold() -> f32 {
    DEFAULT_CLICK_THRESHOLD
}
fn default_wheel_zoom_step() -> f32 {
    1.15
}
fn default_max_chunks() -> usize {
    DEFAULT_MAX_CHUNKS
}
fn default_chunk_prefixes() -> Vec<String> {
    vec!["map".to_owned()]
}
fn default_stats_refresh_secs() -> f64 {
    15.0
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerConfig {
            saves_root: default_saves_root(),
            backup_root: default_backup_root(),
            tile_base_url: default_tile_base_url(),
            tile_span: default_tile_span(),
            fit_padding: default_fit_padding(),
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
            click_threshold: default_click_threshold(),
            wheel_zoom_step: default_wheel_zoom_step(),
            max_chunks: default_max_chunks(),
            chunk_prefixes: default_chunk_prefixes(),
            stats_refresh_secs: default_stats_refresh_secs(),
        }
    }
}

impl ViewerConfig {
    /// Parse and validate a config from a JSON string.
    pub fn load_from_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a config file; only JSON is supported.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ViewerError> {
        let p = path.as_ref();
        if p.extension().and_then(|e| e.to_str()) != Some("json") {
            return Err(ViewerError::UnsupportedFormat(p.display().to_string()));
        }
        let txt = std::fs::read_to_string(p).map_err(|e| ViewerError::io(p, e))?;
        let config = Self::load_from_str(&txt).map_err(|source| ViewerError::Json {
            path: p.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the viewer cannot work with.
    pub fn validate(&self) -> Result<(), ViewerError> {
        let fail = |msg: &str| Err(ViewerError::InvalidConfig(msg.to_owned()));
        if !(self.min_scale > 0.0) {
            return fail("min_scale must be positive");
        }
        if !(self.min_scale < self.max_scale) {
            return fail("min_scale must be below max_scale");
        }
        if self.tile_span <= 0 {
            return fail("tile_span must be positive");
        }
        if !(self.click_threshold >= 0.0) {
            return fail("click_threshold must not be negative");
        }
        if !(self.wheel_zoom_step > 1.0) {
            return fail("wheel_zoom_step must be greater than 1");
        }
        if self.max_chunks == 0 {
            return fail("max_chunks must be positive");
        }
        if !(self.fit_padding >= 0.0) {
            return fail("fit_padding must not be negative");
        }
        if !(self.stats_refresh_secs.is_finite() && self.stats_refresh_secs >= MIN_STATS_REFRESH_SECS) {
            return Err(ViewerError::InvalidConfig(format!(
                "stats_refresh_secs must be a finite number of at least {MIN_STATS_REFRESH_SECS}"
            )));
        }
        Ok(())
    }
}
