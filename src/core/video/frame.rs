use std::time::Duration;

use image::{GrayImage, RgbaImage};

use crate::core::video::roi::Roi;

/// Decoded RGBA frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGBA, row-major
    pub timestamp: Duration,
    /// 0-based ordinal within the pass.
    pub frame_number: u64,
}

impl Frame {
    pub fn new(
        width: u32,
        height: u32,
        data: Vec<u8>,
        timestamp_ms: u64,
        frame_number: u64,
    ) -> Self {
        Self {
            width,
            height,
            data,
            timestamp: Duration::from_millis(timestamp_ms),
            frame_number,
        }
    }

    /// Builds a frame whose timestamp is derived from a constant frame rate.
    pub fn at_rate(
        width: u32,
        height: u32,
        data: Vec<u8>,
        frame_number: u64,
        frame_rate: f64,
    ) -> Self {
        Self {
            width,
            height,
            data,
            timestamp: Duration::from_secs_f64(frame_number as f64 / frame_rate),
            frame_number,
        }
    }

    pub fn from_image(image: RgbaImage, frame_number: u64, frame_rate: f64) -> Self {
        let (width, height) = image.dimensions();
        Self::at_rate(width, height, image.into_raw(), frame_number, frame_rate)
    }

    pub fn pixel_count(&self) -> usize {
        (self.width * self.height) as usize
    }

    pub fn has_valid_layout(&self) -> bool {
        self.data.len() == self.pixel_count() * 4
    }

    pub fn to_rgb(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.pixel_count() * 3);
        for chunk in self.data.chunks_exact(4) {
            rgb.push(chunk[0]); // R
            rgb.push(chunk[1]); // G
            rgb.push(chunk[2]); // B
        }
        rgb
    }

    /// Full-frame luma.
    pub fn to_gray(&self) -> GrayImage {
        let luma: Vec<u8> = self.data.chunks_exact(4).map(luma).collect();
        GrayImage::from_raw(self.width, self.height, luma)
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }

    /// Crops to `roi` and converts only the cropped pixels to luma.
    /// The ROI must lie inside the frame.
    pub fn crop_gray(&self, roi: &Roi) -> GrayImage {
        let stride = self.width as usize * 4;
        let mut luma_data = Vec::with_capacity((roi.w * roi.h) as usize);

        for row in roi.y..roi.y + roi.h {
            let start = row as usize * stride + roi.x as usize * 4;
            let end = start + roi.w as usize * 4;
            luma_data.extend(self.data[start..end].chunks_exact(4).map(luma));
        }

        GrayImage::from_raw(roi.w, roi.h, luma_data).unwrap_or_else(|| GrayImage::new(roi.w, roi.h))
    }
}

/// BT.601 luma of one RGBA pixel. Frames and templates share it so that
/// identical colours correlate exactly.
pub(crate) fn luma(rgba: &[u8]) -> u8 {
    ((rgba[0] as u32 * 299 + rgba[1] as u32 * 587 + rgba[2] as u32 * 114) / 1000) as u8
}

/// Grayscale with the same weights as [`Frame::to_gray`].
pub fn rgba_to_gray(image: &RgbaImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let luma_data: Vec<u8> = image.as_raw().chunks_exact(4).map(luma).collect();
    GrayImage::from_raw(width, height, luma_data).unwrap_or_else(|| GrayImage::new(width, height))
}

/// Frame metadata without the pixel buffer.
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
    pub timestamp_ms: u64,
    pub frame_number: u64,
}

impl FrameInfo {
    pub fn from_frame(frame: &Frame) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            timestamp_ms: frame.timestamp.as_millis() as u64,
            frame_number: frame.frame_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let data = vec![255u8; 100 * 100 * 4]; // 100x100 white image
        let frame = Frame::new(100, 100, data, 1000, 30);

        assert_eq!(frame.width, 100);
        assert_eq!(frame.height, 100);
        assert_eq!(frame.pixel_count(), 10000);
        assert_eq!(frame.timestamp.as_millis(), 1000);
        assert_eq!(frame.frame_number, 30);
        assert!(frame.has_valid_layout());
    }

    #[test]
    fn test_timestamp_from_rate() {
        let frame = Frame::at_rate(2, 2, vec![0u8; 16], 30, 60.0);
        assert_eq!(frame.timestamp.as_millis(), 500);
    }

    #[test]
    fn test_crop_gray_is_roi_relative() {
        let width = 8;
        let height = 6;
        let mut data = vec![0u8; width * height * 4];
        // mark pixel (5, 4) white
        let idx = (4 * width + 5) * 4;
        data[idx..idx + 4].copy_from_slice(&[255, 255, 255, 255]);
        let frame = Frame::new(width as u32, height as u32, data, 0, 0);

        let crop = frame.crop_gray(&Roi::new(3, 2, 4, 3));
        assert_eq!(crop.dimensions(), (4, 3));
        assert_eq!(crop.get_pixel(2, 2)[0], 255);
        assert_eq!(crop.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_luma_weights() {
        let frame = Frame::new(1, 1, vec![255, 0, 0, 255], 0, 0);
        assert_eq!(frame.to_gray().get_pixel(0, 0)[0], 76);
    }

    #[test]
    fn test_image_gray_matches_frame_gray() {
        let image = RgbaImage::from_fn(3, 2, |x, y| {
            image::Rgba([(x * 90) as u8, (y * 120) as u8, 200, 255])
        });
        let frame = Frame::from_image(image.clone(), 0, 30.0);
        assert_eq!(rgba_to_gray(&image), frame.to_gray());
    }
}
