use log::{debug, info};
use serde::Serialize;

use crate::core::config::FilterConfig;
use crate::core::error::{ClipError, ClipResult};
use crate::core::video::frame::Frame;
use crate::core::video::roi::{MatchLocation, RoiSpec, UiContext};
use crate::core::video::sharpness::{laplacian_variance, BlurCheck};
use crate::core::video::template::Template;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    Menu(UiContext),
    Blur,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameVerdict {
    Keep,
    Discard(DiscardReason),
}

impl FrameVerdict {
    pub fn is_discard(&self) -> bool {
        matches!(self, FrameVerdict::Discard(_))
    }
}

pub trait FrameClassifier: Send + Sync {
    fn classify(&self, frame: &Frame) -> ClipResult<FrameVerdict>;
}

/// One `(template, roi, tolerance) -> bool` predicate.
#[derive(Debug, Clone)]
pub struct UiCheck {
    pub spec: RoiSpec,
    template: Template,
}

impl UiCheck {
    pub fn new(spec: &RoiSpec, template: Template) -> ClipResult<Self> {
        if !template.fits_in(&spec.roi) {
            return Err(ClipError::InvalidRoi {
                context: spec.context,
                reason: format!(
                    "template {}x{} does not fit inside ROI {}x{}",
                    template.width(),
                    template.height(),
                    spec.roi.w,
                    spec.roi.h
                ),
            });
        }
        Ok(Self {
            spec: spec.clone(),
            template,
        })
    }

    pub fn context(&self) -> UiContext {
        self.spec.context
    }

    pub fn locate(&self, frame: &Frame) -> MatchLocation {
        self.template.match_in(frame, &self.spec.roi).location
    }

    pub fn matches(&self, frame: &Frame) -> bool {
        self.spec.is_expected(self.locate(frame))
    }
}

/// Ordered UI checks, then an optional blur test.
pub struct MenuFrameClassifier {
    checks: Vec<UiCheck>,
    blur: Option<BlurCheck>,
    frame_width: u32,
    frame_height: u32,
}

impl MenuFrameClassifier {
    /// Loads every template named by `config` and validates the ROI set.
    /// Fails before any frame is looked at.
    pub fn load(config: &FilterConfig) -> ClipResult<Self> {
        config.validate()?;

        let mut checks = Vec::with_capacity(config.rois.len());
        for spec in &config.rois {
            let template = Template::load(&config.template_path(spec))?;
            checks.push(UiCheck::new(spec, template)?);
        }

        info!(
            "✅ Classifier ready: {} UI checks, blur check {}",
            checks.len(),
            if config.blur_check { "on" } else { "off" }
        );

        Ok(Self::from_checks(
            checks,
            config.blur_check.then(|| BlurCheck::new(config.blur_threshold)),
            config.frame_width,
            config.frame_height,
        ))
    }

    pub fn from_checks(
        checks: Vec<UiCheck>,
        blur: Option<BlurCheck>,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        Self {
            checks,
            blur,
            frame_width,
            frame_height,
        }
    }

    pub fn checks(&self) -> &[UiCheck] {
        &self.checks
    }
}

impl FrameClassifier for MenuFrameClassifier {
    fn classify(&self, frame: &Frame) -> ClipResult<FrameVerdict> {
        if frame.width != self.frame_width
            || frame.height != self.frame_height
            || !frame.has_valid_layout()
        {
            return Err(ClipError::FrameSize {
                index: frame.frame_number,
                width: frame.width,
                height: frame.height,
                expected_width: self.frame_width,
                expected_height: self.frame_height,
            });
        }

        if let Some(check) = self.checks.iter().find(|check| check.matches(frame)) {
            debug!("Frame {}: {} detected", frame.frame_number, check.context());
            return Ok(FrameVerdict::Discard(DiscardReason::Menu(check.context())));
        }

        if let Some(blur) = &self.blur {
            let gray = frame.to_gray();
            if blur.is_blurry(&gray) {
                debug!(
                    "Frame {}: blurry (laplacian variance {:.1})",
                    frame.frame_number,
                    laplacian_variance(&gray)
                );
                return Ok(FrameVerdict::Discard(DiscardReason::Blur));
            }
        }

        Ok(FrameVerdict::Keep)
    }
}

pub struct MockFrameClassifier {
    // discard decision by frame number
    discard_pattern: Option<Box<dyn Fn(u64) -> bool + Send + Sync>>,
}

impl MockFrameClassifier {
    pub fn new() -> Self {
        Self {
            discard_pattern: None,
        }
    }

    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(u64) -> bool + Send + Sync + 'static,
    {
        Self {
            discard_pattern: Some(Box::new(pattern)),
        }
    }

    pub fn with_fixed_frames(frames: Vec<u64>) -> Self {
        Self {
            discard_pattern: Some(Box::new(move |frame_num| frames.contains(&frame_num))),
        }
    }

    /// `verdicts[i]` is the discard flag for frame `i`; frames past the end are kept.
    pub fn with_verdicts(verdicts: Vec<bool>) -> Self {
        Self::with_pattern(move |n| verdicts.get(n as usize).copied().unwrap_or(false))
    }
}

impl Default for MockFrameClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClassifier for MockFrameClassifier {
    fn classify(&self, frame: &Frame) -> ClipResult<FrameVerdict> {
        let discard = self
            .discard_pattern
            .as_ref()
            .map(|p| p(frame.frame_number))
            .unwrap_or(false);

        Ok(if discard {
            FrameVerdict::Discard(DiscardReason::Blur)
        } else {
            FrameVerdict::Keep
        })
    }
}
