pub mod cut_list;
pub mod cutter;
pub mod error;
pub mod track;

pub use cut_list::{CutInterval, CutList};
pub use cutter::{AudioCutApplier, CutReport};
pub use error::AudioError;
pub use track::{AudioSink, AudioSource, AudioTrack, WavFile};
