//! Frame sources and sinks backed by numbered image files.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use log::{debug, info};

use crate::core::error::{ClipError, ClipResult};
use crate::core::video::frame::Frame;

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Produces decoded frames in capture order.
pub trait FrameSource {
    /// `Ok(None)` marks the end of the clip.
    fn read_frame(&mut self) -> ClipResult<Option<Frame>>;

    fn frame_count_hint(&self) -> Option<u64> {
        None
    }
}

/// Persists retained frames keyed by a gapless sequence number.
pub trait FrameSink {
    fn write_frame(&mut self, sequence: u64, frame: &Frame) -> ClipResult<()>;
}

/// Reads every image file in a directory, sorted by file name.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
    frame_rate: f64,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path, frame_rate: f64) -> ClipResult<Self> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        info!("📂 Image sequence source: {} frames in {:?}", paths.len(), dir);
        Ok(Self {
            paths,
            next: 0,
            frame_rate,
        })
    }
}

impl FrameSource for ImageSequenceSource {
    fn read_frame(&mut self) -> ClipResult<Option<Frame>> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        let index = self.next as u64;

        let image = image::open(path)
            .map_err(|e| ClipError::FrameRead {
                index,
                reason: format!("{:?}: {}", path, e),
            })?
            .to_rgba8();
        self.next += 1;

        Ok(Some(Frame::from_image(image, index, self.frame_rate)))
    }

    fn frame_count_hint(&self) -> Option<u64> {
        Some(self.paths.len() as u64)
    }
}

/// Writes frames as `{sequence:0width$}.{extension}`, the pattern an
/// `%05d.jpg`-style reassembly step expects.
pub struct ImageSequenceSink {
    dir: PathBuf,
    digits: usize,
    extension: String,
}

impl ImageSequenceSink {
    pub fn new(dir: impl Into<PathBuf>) -> ClipResult<Self> {
        Self::with_pattern(dir, 5, "jpg")
    }

    pub fn with_pattern(
        dir: impl Into<PathBuf>,
        digits: usize,
        extension: &str,
    ) -> ClipResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            digits,
            extension: extension.trim_start_matches('.').to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// printf-style pattern for external tools, e.g. `frames/%05d.jpg`.
    pub fn printf_pattern(&self) -> PathBuf {
        self.dir.join(format!("%0{}d.{}", self.digits, self.extension))
    }

    pub fn path_for(&self, sequence: u64) -> PathBuf {
        self.dir.join(format!(
            "{:0width$}.{}",
            sequence,
            self.extension,
            width = self.digits
        ))
    }
}

impl FrameSink for ImageSequenceSink {
    fn write_frame(&mut self, sequence: u64, frame: &Frame) -> ClipResult<()> {
        let rgb = RgbImage::from_raw(frame.width, frame.height, frame.to_rgb()).ok_or_else(|| {
            ClipError::FrameRead {
                index: frame.frame_number,
                reason: "pixel buffer does not match frame size".into(),
            }
        })?;
        let path = self.path_for(sequence);
        debug!("Writing frame {} as {:?}", frame.frame_number, path);
        rgb.save(&path)?;
        Ok(())
    }
}
