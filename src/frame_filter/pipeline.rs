use log::{debug, info};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;

use crate::core::audio::CutList;
use crate::core::config::{FilterConfig, TrailingRunPolicy};
use crate::core::error::{ClipError, ClipResult};
use crate::core::video::frame::{Frame, FrameInfo};
use crate::frame_filter::classifier::{DiscardReason, FrameClassifier, FrameVerdict};
use crate::frame_filter::state_machine::{CutRunTracker, TrackedFrame};

#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub frame_info: FrameInfo,
    pub verdict: FrameVerdict,
    pub tracked: TrackedFrame,
}

impl FilterOutcome {
    /// Output number when the frame is retained.
    pub fn sequence(&self) -> Option<u64> {
        self.tracked.sequence
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub total_frames: u64,
    pub kept_frames: u64,
    pub discarded_frames: u64,
    pub menu_discards: u64,
    pub blur_discards: u64,
    pub frame_rate: f64,
    pub cuts: CutList,
}

impl PassSummary {
    /// Percentage of frames discarded.
    pub fn discard_rate(&self) -> f64 {
        if self.total_frames == 0 {
            return 0.0;
        }
        self.discarded_frames as f64 / self.total_frames as f64 * 100.0
    }

    pub fn cut_duration(&self) -> f64 {
        self.cuts.total_duration()
    }

    pub fn to_json(&self) -> ClipResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One classification pass over one clip.
pub struct FrameFilter {
    tracker: CutRunTracker,
    pool: ThreadPool,
    frame_rate: f64,
    trailing_run: TrailingRunPolicy,
    menu_discards: u64,
    blur_discards: u64,
}

impl FrameFilter {
    pub fn new() -> ClipResult<Self> {
        Self::with_config(&FilterConfig::default())
    }

    pub fn with_config(config: &FilterConfig) -> ClipResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers.max(1))
            .thread_name(|i| format!("frame-classifier-{}", i))
            .build()
            .map_err(|e| ClipError::WorkerPool(e.to_string()))?;

        Ok(Self {
            tracker: CutRunTracker::with_sequence_start(config.frame_rate, config.sequence_start),
            pool,
            frame_rate: config.frame_rate,
            trailing_run: config.trailing_run,
            menu_discards: 0,
            blur_discards: 0,
        })
    }

    pub fn process_frame(
        &mut self,
        frame: &Frame,
        classifier: &dyn FrameClassifier,
    ) -> ClipResult<FilterOutcome> {
        let verdict = classifier.classify(frame)?;
        self.fold(FrameInfo::from_frame(frame), verdict)
    }

    /// Classifies `frames` in parallel, then feeds the verdicts to the
    /// tracker strictly in order. Fails on the earliest bad frame.
    pub fn process_batch(
        &mut self,
        frames: &[Frame],
        classifier: &dyn FrameClassifier,
    ) -> ClipResult<Vec<FilterOutcome>> {
        let verdicts: Vec<ClipResult<FrameVerdict>> = self
            .pool
            .install(|| frames.par_iter().map(|f| classifier.classify(f)).collect());

        let mut outcomes = Vec::with_capacity(frames.len());
        for (frame, verdict) in frames.iter().zip(verdicts) {
            outcomes.push(self.fold(FrameInfo::from_frame(frame), verdict?)?);
        }
        Ok(outcomes)
    }

    /// Feeds one verdict, computed elsewhere, to the tracker.
    pub fn fold(
        &mut self,
        frame_info: FrameInfo,
        verdict: FrameVerdict,
    ) -> ClipResult<FilterOutcome> {
        let tracked = self
            .tracker
            .process_frame(frame_info.frame_number, verdict.is_discard())?;

        match verdict {
            FrameVerdict::Discard(DiscardReason::Menu(_)) => self.menu_discards += 1,
            FrameVerdict::Discard(DiscardReason::Blur) => self.blur_discards += 1,
            FrameVerdict::Keep => {}
        }

        Ok(FilterOutcome {
            frame_info,
            verdict,
            tracked,
        })
    }

    pub fn frame_count(&self) -> u64 {
        self.tracker.frame_count()
    }

    pub fn kept_count(&self) -> u64 {
        self.tracker.kept_count()
    }

    pub fn discarded_count(&self) -> u64 {
        self.tracker.discarded_count()
    }

    pub fn finish(self) -> ClipResult<PassSummary> {
        let total_frames = self.tracker.frame_count();
        let kept_frames = self.tracker.kept_count();
        let discarded_frames = self.tracker.discarded_count();
        let cuts = self.tracker.finish(self.trailing_run)?;

        let summary = PassSummary {
            total_frames,
            kept_frames,
            discarded_frames,
            menu_discards: self.menu_discards,
            blur_discards: self.blur_discards,
            frame_rate: self.frame_rate,
            cuts,
        };

        info!(
            "📊 Marked frames: {} ({:.1}%)",
            summary.discarded_frames,
            summary.discard_rate()
        );
        debug!(
            "Pass finished: {} menu, {} blurry, {} cuts ({:.2}s)",
            summary.menu_discards,
            summary.blur_discards,
            summary.cuts.len(),
            summary.cut_duration()
        );
        Ok(summary)
    }
}
