use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::core::error::{ClipError, ClipResult};
use crate::core::video::roi::{
    RoiRegistry, RoiSpec, CALIBRATED_HEIGHT, CALIBRATED_WIDTH, DEFAULT_ROIS,
};

/// What to do with a discarded run that is still open when the clip ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailingRunPolicy {
    /// Close the run at the end of the last frame and cut its audio too.
    #[default]
    Excise,
    /// Leave the run open; its audio stays in the track.
    Retain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub frame_rate: f64,
    pub frame_width: u32,
    pub frame_height: u32,
    pub template_dir: PathBuf,
    /// Checked in order; the first positive wins.
    pub rois: Vec<RoiSpec>,
    pub blur_check: bool,
    pub blur_threshold: f64,
    pub trailing_run: TrailingRunPolicy,
    /// Number given to the first retained frame.
    pub sequence_start: u64,
    pub batch_size: usize,
    pub workers: usize,
    pub progress_interval: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60.0,
            frame_width: CALIBRATED_WIDTH,
            frame_height: CALIBRATED_HEIGHT,
            template_dir: PathBuf::from("UI"),
            rois: DEFAULT_ROIS.clone(),
            blur_check: true,
            blur_threshold: 100.0,
            trailing_run: TrailingRunPolicy::Excise,
            sequence_start: 0,
            batch_size: 64,
            workers: num_cpus::get(),
            progress_interval: 600,
        }
    }
}

impl FilterConfig {
    /// Menu detection only, every sharp-or-blurry frame without UI is kept.
    pub fn menus_only() -> Self {
        Self {
            blur_check: false,
            ..Default::default()
        }
    }

    pub fn with_frame_rate(frame_rate: f64) -> Self {
        Self {
            frame_rate,
            ..Default::default()
        }
    }

    pub fn from_json(text: &str) -> ClipResult<Self> {
        let config: FilterConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ClipResult<Self> {
        info!("⚙️ Loading filter config from {:?}", path);
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn registry(&self) -> RoiRegistry {
        RoiRegistry::new(self.rois.clone())
    }

    pub fn template_path(&self, spec: &RoiSpec) -> PathBuf {
        self.template_dir.join(&spec.template)
    }

    pub fn validate(&self) -> ClipResult<()> {
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(ClipError::InvalidConfig(format!(
                "frame_rate must be a positive number, got {}",
                self.frame_rate
            )));
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(ClipError::InvalidConfig(format!(
                "frame size {}x{} is empty",
                self.frame_width, self.frame_height
            )));
        }
        if self.batch_size == 0 {
            return Err(ClipError::InvalidConfig("batch_size must be at least 1".into()));
        }
        if self.workers == 0 {
            return Err(ClipError::InvalidConfig("workers must be at least 1".into()));
        }
        if self.blur_check && (!self.blur_threshold.is_finite() || self.blur_threshold < 0.0) {
            return Err(ClipError::InvalidConfig(format!(
                "blur_threshold must be finite and >= 0, got {}",
                self.blur_threshold
            )));
        }
        self.registry().validate(self.frame_width, self.frame_height)
    }
}
