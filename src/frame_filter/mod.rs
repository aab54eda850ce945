//! Menu/blur frame filter.
//!
//! 1. Classifier - ordered template checks against fixed ROIs, then a blur test
//! 2. Run tracker - two-state machine turning discarded runs into audio cuts
//! 3. Pipeline - parallel classification, in-order folding, pass summary

pub mod classifier;
pub mod pipeline;
pub mod state_machine;

pub use classifier::{
    DiscardReason, FrameClassifier, FrameVerdict, MenuFrameClassifier, MockFrameClassifier, UiCheck,
};
pub use pipeline::{FilterOutcome, FrameFilter, PassSummary};
pub use state_machine::{CutRunTracker, RunState, StateAction, TrackedFrame};
