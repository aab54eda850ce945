pub mod audio;
pub mod config;
pub mod error;
pub mod video;

pub use config::{FilterConfig, TrailingRunPolicy};
pub use error::{ClipError, ClipResult};
