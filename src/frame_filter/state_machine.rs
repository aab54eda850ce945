use log::debug;

use crate::core::audio::{AudioError, CutInterval, CutList};
use crate::core::config::TrailingRunPolicy;
use crate::core::error::{ClipError, ClipResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Normal,
    InMenuRun { run_start_frame: u64 },
}

impl RunState {
    pub fn new() -> Self {
        RunState::Normal
    }

    /// Total over `{Normal, InMenuRun} x {keep, discard}`.
    pub fn transition(&self, discard: bool, frame_index: u64) -> (RunState, StateAction) {
        match (*self, discard) {
            (RunState::Normal, false) => (RunState::Normal, StateAction::Retain),
            (RunState::Normal, true) => (
                RunState::InMenuRun {
                    run_start_frame: frame_index,
                },
                StateAction::OpenRun,
            ),
            (RunState::InMenuRun { run_start_frame }, true) => (
                RunState::InMenuRun { run_start_frame },
                StateAction::ExtendRun,
            ),
            (RunState::InMenuRun { run_start_frame }, false) => (
                RunState::Normal,
                StateAction::CloseRun {
                    start_frame: run_start_frame,
                    end_frame: frame_index,
                },
            ),
        }
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    Retain,
    OpenRun,
    ExtendRun,
    /// Keep the current frame and excise `[start_frame, end_frame)`.
    CloseRun { start_frame: u64, end_frame: u64 },
}

impl StateAction {
    pub fn retains_frame(&self) -> bool {
        matches!(self, StateAction::Retain | StateAction::CloseRun { .. })
    }
}

/// Result of feeding one frame to the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedFrame {
    pub frame_index: u64,
    pub action: StateAction,
    /// Output number for a retained frame.
    pub sequence: Option<u64>,
    pub closed: Option<CutInterval>,
}

/// Pass-scoped run tracker. Owns the cut list and the output counter.
pub struct CutRunTracker {
    state: RunState,
    frame_rate: f64,
    sequence_start: u64,
    frame_counter: u64,
    kept: u64,
    cuts: CutList,
}

impl CutRunTracker {
    pub fn new(frame_rate: f64) -> Self {
        Self::with_sequence_start(frame_rate, 0)
    }

    pub fn with_sequence_start(frame_rate: f64, sequence_start: u64) -> Self {
        Self {
            state: RunState::Normal,
            frame_rate,
            sequence_start,
            frame_counter: 0,
            kept: 0,
            cuts: CutList::new(),
        }
    }

    /// `frame_index` must be the next 0-based ordinal; anything else would
    /// desynchronize frame numbers from audio time.
    pub fn process_frame(&mut self, frame_index: u64, discard: bool) -> ClipResult<TrackedFrame> {
        if frame_index != self.frame_counter {
            return Err(ClipError::OutOfOrder {
                expected: self.frame_counter,
                got: frame_index,
            });
        }
        self.frame_counter += 1;

        let (new_state, action) = self.state.transition(discard, frame_index);
        self.state = new_state;

        let closed = match action {
            StateAction::CloseRun {
                start_frame,
                end_frame,
            } => Some(self.close_run(start_frame, end_frame)?),
            _ => None,
        };

        let sequence = if action.retains_frame() {
            let sequence = self.sequence_start + self.kept;
            self.kept += 1;
            Some(sequence)
        } else {
            None
        };

        Ok(TrackedFrame {
            frame_index,
            action,
            sequence,
            closed,
        })
    }

    fn close_run(&mut self, start_frame: u64, end_frame: u64) -> Result<CutInterval, AudioError> {
        let interval = CutInterval::from_frames(start_frame, end_frame, self.frame_rate);
        debug!(
            "Run closed: frames {}..{} ({:.3}s..{:.3}s)",
            start_frame, end_frame, interval.start, interval.end
        );
        self.cuts.push(interval)?;
        Ok(interval)
    }

    pub fn current_state(&self) -> &RunState {
        &self.state
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    pub fn kept_count(&self) -> u64 {
        self.kept
    }

    pub fn discarded_count(&self) -> u64 {
        self.frame_counter - self.kept
    }

    pub fn cuts(&self) -> &CutList {
        &self.cuts
    }

    /// Ends the pass and hands over the cut list. An open run is closed at
    /// the end of the last frame under `TrailingRunPolicy::Excise`.
    pub fn finish(mut self, policy: TrailingRunPolicy) -> ClipResult<CutList> {
        if let RunState::InMenuRun { run_start_frame } = self.state {
            match policy {
                TrailingRunPolicy::Excise => {
                    let end_frame = self.frame_counter;
                    self.close_run(run_start_frame, end_frame)?;
                }
                TrailingRunPolicy::Retain => {
                    debug!(
                        "Clip ends inside a discarded run starting at frame {}; audio retained",
                        run_start_frame
                    );
                }
            }
            self.state = RunState::Normal;
        }
        Ok(self.cuts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const K: bool = false;
    const D: bool = true;

    fn run(verdicts: &[bool], rate: f64, policy: TrailingRunPolicy) -> (Vec<u64>, CutList, u64) {
        let mut tracker = CutRunTracker::new(rate);
        let mut sequences = Vec::new();
        for (i, &discard) in verdicts.iter().enumerate() {
            let tracked = tracker.process_frame(i as u64, discard).unwrap();
            sequences.extend(tracked.sequence);
        }
        let kept = tracker.kept_count();
        (sequences, tracker.finish(policy).unwrap(), kept)
    }

    fn times(cuts: &CutList) -> Vec<(f64, f64)> {
        cuts.iter().map(|c| (c.start, c.end)).collect()
    }

    fn assert_times(actual: &CutList, expected: &[(f64, f64)]) {
        let actual = times(actual);
        assert_eq!(actual.len(), expected.len(), "{:?} vs {:?}", actual, expected);
        for ((s, e), (es, ee)) in actual.iter().zip(expected) {
            assert!(
                (s - es).abs() < 1e-9 && (e - ee).abs() < 1e-9,
                "{:?} vs {:?}",
                actual,
                expected
            );
        }
    }

    #[test]
    fn test_transition_table_is_total() {
        assert_eq!(
            RunState::Normal.transition(false, 3),
            (RunState::Normal, StateAction::Retain)
        );
        assert_eq!(
            RunState::Normal.transition(true, 3),
            (RunState::InMenuRun { run_start_frame: 3 }, StateAction::OpenRun)
        );
        assert_eq!(
            RunState::InMenuRun { run_start_frame: 3 }.transition(true, 4),
            (RunState::InMenuRun { run_start_frame: 3 }, StateAction::ExtendRun)
        );
        assert_eq!(
            RunState::InMenuRun { run_start_frame: 3 }.transition(false, 5),
            (
                RunState::Normal,
                StateAction::CloseRun {
                    start_frame: 3,
                    end_frame: 5
                }
            )
        );
    }

    #[test]
    fn test_two_runs_become_two_cuts() {
        let verdicts = [K, K, D, D, K, K, K, D, K, K];
        let (sequences, cuts, kept) = run(&verdicts, 10.0, TrailingRunPolicy::Excise);

        assert_times(&cuts, &[(0.2, 0.4), (0.7, 0.8)]);
        assert_eq!(kept, 7);
        assert_eq!(sequences, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_all_keep_yields_no_cuts() {
        let (sequences, cuts, kept) = run(&[K; 12], 30.0, TrailingRunPolicy::Excise);
        assert!(cuts.is_empty());
        assert_eq!(kept, 12);
        assert_eq!(sequences, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn test_all_discard_depends_on_trailing_policy() {
        let (sequences, cuts, kept) = run(&[D; 6], 30.0, TrailingRunPolicy::Retain);
        assert!(cuts.is_empty());
        assert_eq!(kept, 0);
        assert!(sequences.is_empty());

        let (_, cuts, _) = run(&[D; 6], 30.0, TrailingRunPolicy::Excise);
        assert_times(&cuts, &[(0.0, 0.2)]);
    }

    #[test]
    fn test_single_discard_frame() {
        let (_, cuts, kept) = run(&[K, D, K], 5.0, TrailingRunPolicy::Excise);
        assert_times(&cuts, &[(0.2, 0.4)]);
        assert_eq!(kept, 2);
    }

    #[test]
    fn test_trailing_run_closes_at_clip_end() {
        let (_, cuts, _) = run(&[K, K, D, K, D, D], 10.0, TrailingRunPolicy::Excise);
        assert_times(&cuts, &[(0.2, 0.3), (0.4, 0.6)]);

        let (_, cuts, _) = run(&[K, K, D, K, D, D], 10.0, TrailingRunPolicy::Retain);
        assert_times(&cuts, &[(0.2, 0.3)]);
    }

    #[test]
    fn test_invariants_over_all_short_patterns() {
        // every verdict sequence of length 1..=10
        for len in 1..=10u32 {
            for bits in 0..(1u32 << len) {
                let verdicts: Vec<bool> = (0..len).map(|i| bits & (1 << i) != 0).collect();
                let mut tracker = CutRunTracker::with_sequence_start(24.0, 1);
                let mut sequences = Vec::new();
                for (i, &discard) in verdicts.iter().enumerate() {
                    let tracked = tracker.process_frame(i as u64, discard).unwrap();
                    assert_eq!(tracked.sequence.is_some(), !discard);
                    sequences.extend(tracked.sequence);
                }

                let kept = tracker.kept_count();
                let discarded = tracker.discarded_count();
                assert_eq!(kept + discarded, len as u64);
                assert_eq!(discarded, verdicts.iter().filter(|&&d| d).count() as u64);
                assert_eq!(sequences, (1..=kept).collect::<Vec<_>>());

                let cuts = tracker.finish(TrailingRunPolicy::Excise).unwrap();
                let mut previous_end = f64::NEG_INFINITY;
                for cut in &cuts {
                    assert!(cut.start < cut.end);
                    assert!(cut.start >= previous_end);
                    assert_eq!(cut.start, cut.start_frame as f64 / 24.0);
                    assert_eq!(cut.end, cut.end_frame as f64 / 24.0);
                    // run starts on a discard and ends on a keep (or clip end)
                    assert!(verdicts[cut.start_frame as usize]);
                    if (cut.end_frame as usize) < verdicts.len() {
                        assert!(!verdicts[cut.end_frame as usize]);
                    }
                    previous_end = cut.end;
                }
                // with Excise every discarded frame is covered by exactly one cut
                assert_eq!(cuts.total_frames(), discarded);
            }
        }
    }

    #[test]
    fn test_out_of_order_frame_is_rejected() {
        let mut tracker = CutRunTracker::new(30.0);
        tracker.process_frame(0, false).unwrap();
        let err = tracker.process_frame(2, false).unwrap_err();
        assert!(matches!(err, ClipError::OutOfOrder { expected: 1, got: 2 }));
    }

    #[test]
    fn test_close_reports_interval() {
        let mut tracker = CutRunTracker::new(10.0);
        tracker.process_frame(0, true).unwrap();
        let tracked = tracker.process_frame(1, false).unwrap();
        assert_eq!(tracked.sequence, Some(0));
        let closed = tracked.closed.unwrap();
        assert_eq!((closed.start_frame, closed.end_frame), (0, 1));
        assert!(matches!(tracker.current_state(), RunState::Normal));
    }
}
