use std::path::PathBuf;

use thiserror::Error;

use crate::core::audio::AudioError;
use crate::core::video::roi::UiContext;

#[derive(Debug, Error)]
pub enum ClipError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Template {path:?} could not be loaded: {source}")]
    TemplateLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Invalid ROI for {context}: {reason}")]
    InvalidRoi { context: UiContext, reason: String },
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Frame {index} could not be read: {reason}")]
    FrameRead { index: u64, reason: String },
    #[error("Frame {index} is {width}x{height}, expected {expected_width}x{expected_height}")]
    FrameSize {
        index: u64,
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },
    #[error("Frame {got} reached the run tracker out of order (expected {expected})")]
    OutOfOrder { expected: u64, got: u64 },
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
    #[error("FFmpeg failed: {0}")]
    Ffmpeg(String),
}

pub type ClipResult<T> = Result<T, ClipError>;
