//! Normalized cross-correlation template matching (zero-mean, like
//! OpenCV's `TM_CCOEFF_NORMED`).

use std::path::Path;

use image::GrayImage;
use log::{debug, info};

use crate::core::error::{ClipError, ClipResult};
use crate::core::video::frame::{rgba_to_gray, Frame};
use crate::core::video::roi::{MatchLocation, Roi};

/// Peak of the correlation surface, relative to the ROI's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    pub location: MatchLocation,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct Template {
    image: GrayImage,
    // zero-mean template pixels, row-major
    centered: Vec<f64>,
    norm_squared: f64,
}

impl Template {
    pub fn load(path: &Path) -> ClipResult<Self> {
        info!("🖼️ Loading template: {:?}", path);
        let image = image::open(path)
            .map_err(|source| ClipError::TemplateLoad {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        Ok(Self::from_gray(rgba_to_gray(&image)))
    }

    pub fn from_gray(image: GrayImage) -> Self {
        let pixels = image.as_raw();
        let mean = if pixels.is_empty() {
            0.0
        } else {
            pixels.iter().map(|&p| p as f64).sum::<f64>() / pixels.len() as f64
        };
        let centered: Vec<f64> = pixels.iter().map(|&p| p as f64 - mean).collect();
        let norm_squared = centered.iter().map(|v| v * v).sum();

        if norm_squared == 0.0 {
            debug!("Template is flat; every placement will score 0");
        }

        Self {
            image,
            centered,
            norm_squared,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn fits_in(&self, roi: &Roi) -> bool {
        self.width() > 0 && self.height() > 0 && self.width() <= roi.w && self.height() <= roi.h
    }

    /// Crops `frame` to `roi`, grayscales the crop and correlates.
    pub fn match_in(&self, frame: &Frame, roi: &Roi) -> MatchResult {
        let crop = frame.crop_gray(roi);
        self.match_gray(&crop)
    }

    /// Scans every valid placement inside `haystack` and returns the first
    /// global maximum in row-major order. `haystack` must be at least as
    /// large as the template.
    pub fn match_gray(&self, haystack: &GrayImage) -> MatchResult {
        let (hw, hh) = (haystack.width() as usize, haystack.height() as usize);
        let (tw, th) = (self.width() as usize, self.height() as usize);
        let n = (tw * th) as f64;
        let integral = IntegralImage::new(haystack);
        let pixels = haystack.as_raw();

        let mut best = MatchResult {
            location: MatchLocation::new(0, 0),
            score: f64::NEG_INFINITY,
        };

        for v in 0..=(hh - th) {
            for u in 0..=(hw - tw) {
                let (sum, sum_sq) = integral.window(u, v, tw, th);
                let window_var = (sum_sq - sum * sum / n).max(0.0);
                let denom = (self.norm_squared * window_var).sqrt();

                let score = if denom <= f64::EPSILON {
                    0.0
                } else {
                    let mut num = 0.0;
                    for ty in 0..th {
                        let row = (v + ty) * hw + u;
                        let t_row = &self.centered[ty * tw..(ty + 1) * tw];
                        for (tx, &t) in t_row.iter().enumerate() {
                            num += t * pixels[row + tx] as f64;
                        }
                    }
                    num / denom
                };

                if score > best.score {
                    best = MatchResult {
                        location: MatchLocation::new(u as u32, v as u32),
                        score,
                    };
                }
            }
        }

        best
    }
}

/// Summed-area tables for pixel values and their squares, with a zero
/// border row/column.
struct IntegralImage {
    stride: usize,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl IntegralImage {
    fn new(img: &GrayImage) -> Self {
        let (w, h) = (img.width() as usize, img.height() as usize);
        let stride = w + 1;
        let mut sum = vec![0.0; stride * (h + 1)];
        let mut sum_sq = vec![0.0; stride * (h + 1)];
        let pixels = img.as_raw();

        for y in 0..h {
            let mut row_sum = 0.0;
            let mut row_sq = 0.0;
            for x in 0..w {
                let p = pixels[y * w + x] as f64;
                row_sum += p;
                row_sq += p * p;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row_sum;
                sum_sq[idx] = sum_sq[idx - stride] + row_sq;
            }
        }

        Self {
            stride,
            sum,
            sum_sq,
        }
    }

    fn window(&self, x: usize, y: usize, w: usize, h: usize) -> (f64, f64) {
        let s = self.stride;
        let a = y * s + x;
        let b = y * s + x + w;
        let c = (y + h) * s + x;
        let d = (y + h) * s + x + w;
        (
            self.sum[d] - self.sum[b] - self.sum[c] + self.sum[a],
            self.sum_sq[d] - self.sum_sq[b] - self.sum_sq[c] + self.sum_sq[a],
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::Luma;

    /// Distinctive high-contrast pattern that correlates poorly with shifts of itself.
    pub(crate) fn patterned_template(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| Luma([((x * 37 + y * 91 + x * y * 13) % 251) as u8]))
    }

    /// RGBA frame with a checkerboard background and `patch` pasted at `(px, py)`.
    pub(crate) fn frame_with_patch(
        width: u32,
        height: u32,
        patch: Option<(&GrayImage, u32, u32)>,
        frame_number: u64,
    ) -> Frame {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let mut v = if (x + y) % 2 == 0 { 30 } else { 220 };
                if let Some((img, px, py)) = patch {
                    if x >= px && y >= py && x < px + img.width() && y < py + img.height() {
                        v = img.get_pixel(x - px, y - py)[0];
                    }
                }
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        Frame::new(width, height, data, 0, frame_number)
    }

    #[test]
    fn test_exact_patch_is_found() {
        let template_img = patterned_template(12, 8);
        let template = Template::from_gray(template_img.clone());
        let frame = frame_with_patch(120, 60, Some((&template_img, 47, 23)), 0);

        let roi = Roi::new(40, 20, 40, 20);
        let result = template.match_in(&frame, &roi);

        // ROI-relative, not frame-absolute
        assert_eq!(result.location, MatchLocation::new(7, 3));
        assert!(result.score > 0.99);
    }

    #[test]
    fn test_coloured_template_from_disk_matches_exactly() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("button.png");
        let palette = [[220, 30, 30], [30, 200, 60], [40, 60, 230], [250, 250, 120]];
        let colour = |x: u32, y: u32| palette[((x * 3 + y * 5 + x * y) % 4) as usize];
        let coloured = image::RgbaImage::from_fn(12, 8, |x, y| {
            let [r, g, b] = colour(x, y);
            image::Rgba([r, g, b, 255])
        });
        coloured.save(&path).unwrap();
        let template = Template::load(&path).unwrap();

        let (width, height, px, py) = (60u32, 30u32, 27u32, 13u32);
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let inside = x >= px && y >= py && x < px + 12 && y < py + 8;
                let [r, g, b] = if inside {
                    colour(x - px, y - py)
                } else if (x + y) % 2 == 0 {
                    [30, 30, 30]
                } else {
                    [220, 220, 220]
                };
                data.extend_from_slice(&[r, g, b, 255]);
            }
        }
        let frame = Frame::new(width, height, data, 0, 0);

        let result = template.match_in(&frame, &Roi::new(20, 10, 30, 15));
        assert_eq!(result.location, MatchLocation::new(7, 3));
        assert!(result.score > 0.999, "score {}", result.score);
    }

    #[test]
    fn test_match_is_deterministic() {
        let template_img = patterned_template(10, 6);
        let template = Template::from_gray(template_img.clone());
        let frame = frame_with_patch(80, 40, Some((&template_img, 20, 12)), 0);
        let roi = Roi::new(10, 5, 50, 25);

        let first = template.match_in(&frame, &roi);
        for _ in 0..5 {
            assert_eq!(template.match_in(&frame, &roi), first);
        }
    }

    #[test]
    fn test_flat_haystack_scores_zero_at_origin() {
        let template = Template::from_gray(patterned_template(4, 4));
        let haystack = GrayImage::from_pixel(10, 10, Luma([90]));
        let result = template.match_gray(&haystack);
        assert_eq!(result.location, MatchLocation::new(0, 0));
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_template_equal_to_haystack() {
        let img = patterned_template(9, 7);
        let template = Template::from_gray(img.clone());
        let result = template.match_gray(&img);
        assert_eq!(result.location, MatchLocation::new(0, 0));
        assert!((result.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fits_in() {
        let template = Template::from_gray(patterned_template(108, 36));
        assert!(template.fits_in(&Roi::new(736, 717, 449, 51)));
        assert!(!template.fits_in(&Roi::new(0, 0, 100, 51)));
    }

    #[test]
    fn test_missing_template_is_config_error() {
        let err = Template::load(Path::new("/definitely/not/here.jpg")).unwrap_err();
        assert!(matches!(err, ClipError::TemplateLoad { .. }));
    }
}
