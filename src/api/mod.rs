pub mod clip;
pub mod ffmpeg;

pub use clip::{ClipEnhancer, WorkLayout};
