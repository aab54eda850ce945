//! Excises cut intervals from an in-memory track.
//!
//! Intervals are expressed in original track time. Removing them last-first
//! means every interval still addresses untouched samples when its turn comes,
//! since only material after it has been removed so far.

use log::{debug, info, warn};
use serde::Serialize;

use super::cut_list::{CutInterval, CutList};
use super::error::AudioError;
use super::track::AudioTrack;

#[derive(Debug, Clone, Serialize)]
pub struct CutReport {
    pub intervals_applied: usize,
    pub intervals_skipped: usize,
    pub sample_frames_removed: usize,
    pub duration_before: f64,
    pub duration_after: f64,
}

pub struct AudioCutApplier;

impl AudioCutApplier {
    pub fn apply(track: &mut AudioTrack, cuts: &CutList) -> Result<CutReport, AudioError> {
        Self::validate(cuts)?;

        let rate = track.sample_rate() as f64;
        let channels = track.channels();
        let duration_before = track.duration_secs();
        let mut applied = 0;
        let mut skipped = 0;
        let mut removed = 0;

        info!(
            "✂️ Cutting {} intervals ({:.2}s) from {:.2}s of audio",
            cuts.len(),
            cuts.total_duration(),
            duration_before
        );

        for cut in cuts.iter().rev() {
            // track length only shrinks from the tail, so this is the
            // original length up to the start of every interval not yet cut
            let frames = track.frame_count();
            let (start, end) = match sample_span(cut, rate, frames) {
                SampleSpan::Range(start, end) => (start, end),
                SampleSpan::PastEnd => {
                    warn!(
                        "⚠️ Cut {:.3}s..{:.3}s starts after the audio ends ({} frames), skipping",
                        cut.start, cut.end, frames
                    );
                    skipped += 1;
                    continue;
                }
                SampleSpan::BelowResolution => {
                    warn!(
                        "⚠️ Cut {:.3}s..{:.3}s is shorter than one sample at {} Hz, skipping",
                        cut.start, cut.end, rate
                    );
                    skipped += 1;
                    continue;
                }
            };

            debug!("Cutting {:.3}s to {:.3}s", cut.start, cut.end);
            track.samples.drain(start * channels..end * channels);
            removed += end - start;
            applied += 1;
        }

        let report = CutReport {
            intervals_applied: applied,
            intervals_skipped: skipped,
            sample_frames_removed: removed,
            duration_before,
            duration_after: track.duration_secs(),
        };
        info!(
            "✅ Audio trimmed: {:.2}s -> {:.2}s",
            report.duration_before, report.duration_after
        );
        Ok(report)
    }

    fn validate(cuts: &CutList) -> Result<(), AudioError> {
        let mut previous_end = f64::NEG_INFINITY;
        for cut in cuts {
            if !cut.start.is_finite() || !cut.end.is_finite() || cut.start < 0.0 {
                return Err(AudioError::InvalidCut(format!(
                    "interval {}..{} is not a valid time span",
                    cut.start, cut.end
                )));
            }
            if cut.start >= cut.end || cut.start < previous_end {
                return Err(AudioError::InvalidCut(format!(
                    "interval {:.3}s..{:.3}s is empty or out of order",
                    cut.start, cut.end
                )));
            }
            previous_end = cut.end;
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SampleSpan {
    Range(usize, usize),
    PastEnd,
    BelowResolution,
}

/// Sample-frame range of `cut`, clamped to a track of `frames` sample frames.
fn sample_span(cut: &CutInterval, rate: f64, frames: usize) -> SampleSpan {
    let start = (cut.start * rate).round() as usize;
    let end = (cut.end * rate).round() as usize;
    if start >= frames {
        SampleSpan::PastEnd
    } else if start >= end {
        SampleSpan::BelowResolution
    } else {
        SampleSpan::Range(start, end.min(frames))
    }
}
