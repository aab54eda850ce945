//! Calibrated regions of interest for the in-game UI elements.
//!
//! Every rectangle is pixel-absolute for a 1920x1080 capture. Expected match
//! locations are relative to the ROI's own top-left corner, which is also the
//! coordinate space the template matcher reports in.

use std::fmt;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::core::error::{ClipError, ClipResult};

pub const CALIBRATED_WIDTH: u32 = 1920;
pub const CALIBRATED_HEIGHT: u32 = 1080;

const BACK_BUTTON_TEMPLATE: &str = "back button_cropped.jpg";
const SORT_BUTTON_TEMPLATE: &str = "sort button_cropped.jpg";
const HOLD_BUTTON_TEMPLATE: &str = "hold button_cropped.jpg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiContext {
    WeaponMenu,
    AbilitiesMenu,
    SortButton,
    InventoryHold,
}

impl fmt::Display for UiContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UiContext::WeaponMenu => "weapon menu",
            UiContext::AbilitiesMenu => "abilities menu",
            UiContext::SortButton => "sort button",
            UiContext::InventoryHold => "inventory hold prompt",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Roi {
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.w > 0
            && self.h > 0
            && self.x.checked_add(self.w).is_some_and(|right| right <= width)
            && self.y.checked_add(self.h).is_some_and(|bottom| bottom <= height)
    }
}

/// ROI-relative pixel offset of a correlation peak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchLocation {
    pub x: u32,
    pub y: u32,
}

impl MatchLocation {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    fn distance_squared(&self, other: &MatchLocation) -> u64 {
        let dx = self.x.abs_diff(other.x) as u64;
        let dy = self.y.abs_diff(other.y) as u64;
        dx * dx + dy * dy
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiSpec {
    pub context: UiContext,
    pub roi: Roi,
    /// Template file name, resolved against `FilterConfig::template_dir`.
    pub template: PathBuf,
    pub expected: Vec<MatchLocation>,
    /// Maximum Euclidean distance (pixels) between peak and an expected
    /// location; 0 means exact equality.
    #[serde(default)]
    pub tolerance: f32,
}

impl RoiSpec {
    pub fn is_expected(&self, found: MatchLocation) -> bool {
        let limit = (self.tolerance.max(0.0) as f64).powi(2);
        self.expected
            .iter()
            .any(|loc| loc.distance_squared(&found) as f64 <= limit)
    }
}

pub static DEFAULT_ROIS: Lazy<Vec<RoiSpec>> = Lazy::new(|| {
    vec![
        RoiSpec {
            context: UiContext::WeaponMenu,
            roi: Roi::new(736, 717, 449, 51),
            template: PathBuf::from(BACK_BUTTON_TEMPLATE),
            // back button with and without the 'drop' icon next to it
            expected: vec![MatchLocation::new(337, 6), MatchLocation::new(258, 6)],
            tolerance: 0.0,
        },
        RoiSpec {
            context: UiContext::AbilitiesMenu,
            roi: Roi::new(988, 783, 121, 54),
            template: PathBuf::from(BACK_BUTTON_TEMPLATE),
            expected: vec![MatchLocation::new(6, 10)],
            tolerance: 0.0,
        },
        RoiSpec {
            context: UiContext::SortButton,
            roi: Roi::new(374, 710, 165, 70),
            template: PathBuf::from(SORT_BUTTON_TEMPLATE),
            expected: vec![MatchLocation::new(11, 8), MatchLocation::new(12, 8)],
            tolerance: 0.0,
        },
        RoiSpec {
            context: UiContext::InventoryHold,
            roi: Roi::new(1730, 1023, 115, 45),
            template: PathBuf::from(HOLD_BUTTON_TEMPLATE),
            expected: vec![MatchLocation::new(12, 3)],
            tolerance: 0.0,
        },
    ]
});

/// Ordered lookup table; the order is the detection priority.
#[derive(Debug, Clone)]
pub struct RoiRegistry {
    entries: Vec<RoiSpec>,
}

impl RoiRegistry {
    pub fn new(entries: Vec<RoiSpec>) -> Self {
        Self { entries }
    }

    pub fn calibrated() -> Self {
        Self::new(DEFAULT_ROIS.clone())
    }

    pub fn get(&self, context: UiContext) -> Option<&RoiSpec> {
        self.entries.iter().find(|spec| spec.context == context)
    }

    pub fn entries(&self) -> &[RoiSpec] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn validate(&self, frame_width: u32, frame_height: u32) -> ClipResult<()> {
        for spec in &self.entries {
            if !spec.roi.fits_within(frame_width, frame_height) {
                return Err(ClipError::InvalidRoi {
                    context: spec.context,
                    reason: format!(
                        "{:?} does not fit inside a {}x{} frame",
                        spec.roi, frame_width, frame_height
                    ),
                });
            }
            if spec.expected.is_empty() {
                return Err(ClipError::InvalidRoi {
                    context: spec.context,
                    reason: "no expected match locations".into(),
                });
            }
            if !spec.tolerance.is_finite() || spec.tolerance < 0.0 {
                return Err(ClipError::InvalidRoi {
                    context: spec.context,
                    reason: format!("tolerance {} must be finite and >= 0", spec.tolerance),
                });
            }
            if let Some(loc) = spec
                .expected
                .iter()
                .find(|loc| loc.x >= spec.roi.w || loc.y >= spec.roi.h)
            {
                return Err(ClipError::InvalidRoi {
                    context: spec.context,
                    reason: format!("expected location {:?} lies outside the ROI", loc),
                });
            }
        }
        Ok(())
    }
}

impl Default for RoiRegistry {
    fn default() -> Self {
        Self::calibrated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibrated_rois_fit_capture_resolution() {
        let registry = RoiRegistry::calibrated();
        assert_eq!(registry.len(), 4);
        assert!(registry.validate(CALIBRATED_WIDTH, CALIBRATED_HEIGHT).is_ok());
    }

    #[test]
    fn test_calibrated_order_is_priority_order() {
        let contexts: Vec<UiContext> = RoiRegistry::calibrated()
            .entries()
            .iter()
            .map(|spec| spec.context)
            .collect();
        assert_eq!(
            contexts,
            vec![
                UiContext::WeaponMenu,
                UiContext::AbilitiesMenu,
                UiContext::SortButton,
                UiContext::InventoryHold,
            ]
        );
    }

    #[test]
    fn test_weapon_menu_accepts_both_back_button_positions() {
        let registry = RoiRegistry::calibrated();
        let spec = registry.get(UiContext::WeaponMenu).unwrap();
        assert!(spec.is_expected(MatchLocation::new(337, 6)));
        assert!(spec.is_expected(MatchLocation::new(258, 6)));
        assert!(!spec.is_expected(MatchLocation::new(338, 6)));
    }

    #[test]
    fn test_tolerance_band() {
        let mut spec = DEFAULT_ROIS[1].clone();
        assert!(!spec.is_expected(MatchLocation::new(7, 11)));

        spec.tolerance = 1.5;
        assert!(spec.is_expected(MatchLocation::new(7, 11)));
        assert!(!spec.is_expected(MatchLocation::new(8, 10)));
    }

    #[test]
    fn test_rejects_roi_outside_frame() {
        let registry = RoiRegistry::calibrated();
        let err = registry.validate(1280, 720).unwrap_err();
        assert!(matches!(
            err,
            ClipError::InvalidRoi {
                context: UiContext::WeaponMenu,
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_expected_location_outside_roi() {
        let mut spec = DEFAULT_ROIS[3].clone();
        spec.expected.push(MatchLocation::new(200, 3));
        let registry = RoiRegistry::new(vec![spec]);
        assert!(registry.validate(1920, 1080).is_err());
    }
}
