pub mod frame;
pub mod roi;
pub mod sequence;
pub mod sharpness;
pub mod template;

pub use frame::{Frame, FrameInfo};
pub use roi::{MatchLocation, Roi, RoiRegistry, RoiSpec, UiContext, DEFAULT_ROIS};
pub use sequence::{FrameSink, FrameSource, ImageSequenceSink, ImageSequenceSource};
pub use sharpness::{laplacian_variance, BlurCheck};
pub use template::{MatchResult, Template};
