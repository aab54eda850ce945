use serde::Serialize;

use super::error::AudioError;

/// Span of the original, untrimmed track to excise, derived from the frame
/// range `[start_frame, end_frame)` at a constant frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CutInterval {
    pub start_frame: u64,
    pub end_frame: u64,
    /// seconds
    pub start: f64,
    /// seconds
    pub end: f64,
}

impl CutInterval {
    pub fn from_frames(start_frame: u64, end_frame: u64, frame_rate: f64) -> Self {
        Self {
            start_frame,
            end_frame,
            start: start_frame as f64 / frame_rate,
            end: end_frame as f64 / frame_rate,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn frame_count(&self) -> u64 {
        self.end_frame - self.start_frame
    }
}

/// Time-ordered, non-overlapping intervals accumulated over one pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CutList {
    intervals: Vec<CutInterval>,
}

impl CutList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends after checking `start < end` and that the interval begins no
    /// earlier than the previous one ended.
    pub fn push(&mut self, interval: CutInterval) -> Result<(), AudioError> {
        if !(interval.start < interval.end) || interval.start_frame >= interval.end_frame {
            return Err(AudioError::InvalidCut(format!(
                "interval {:.3}s..{:.3}s is empty or reversed",
                interval.start, interval.end
            )));
        }
        if let Some(last) = self.intervals.last() {
            if interval.start_frame < last.end_frame || interval.start < last.end {
                return Err(AudioError::InvalidCut(format!(
                    "interval {:.3}s..{:.3}s overlaps or precedes {:.3}s..{:.3}s",
                    interval.start, interval.end, last.start, last.end
                )));
            }
        }
        self.intervals.push(interval);
        Ok(())
    }

    pub fn from_intervals(intervals: Vec<CutInterval>) -> Result<Self, AudioError> {
        let mut list = Self::new();
        for interval in intervals {
            list.push(interval)?;
        }
        Ok(list)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CutInterval> {
        self.intervals.iter()
    }

    pub fn as_slice(&self) -> &[CutInterval] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn total_duration(&self) -> f64 {
        self.intervals.iter().map(CutInterval::duration).sum()
    }

    pub fn total_frames(&self) -> u64 {
        self.intervals.iter().map(CutInterval::frame_count).sum()
    }
}

impl<'a> IntoIterator for &'a CutList {
    type Item = &'a CutInterval;
    type IntoIter = std::slice::Iter<'a, CutInterval>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_times_from_frames() {
        let cut = CutInterval::from_frames(2, 4, 10.0);
        assert_eq!(cut.start, 0.2);
        assert_eq!(cut.end, 0.4);
        assert_eq!(cut.frame_count(), 2);
    }

    #[test]
    fn test_rejects_empty_interval() {
        let mut list = CutList::new();
        assert!(list.push(CutInterval::from_frames(5, 5, 30.0)).is_err());
        assert!(list.is_empty());
    }

    #[test]
    fn test_rejects_overlap() {
        let mut list = CutList::new();
        list.push(CutInterval::from_frames(10, 20, 30.0)).unwrap();
        assert!(list.push(CutInterval::from_frames(15, 25, 30.0)).is_err());
        assert!(list.push(CutInterval::from_frames(2, 5, 30.0)).is_err());
        // touching is allowed
        list.push(CutInterval::from_frames(20, 21, 30.0)).unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_totals() {
        let list = CutList::from_intervals(vec![
            CutInterval::from_frames(0, 30, 30.0),
            CutInterval::from_frames(60, 75, 30.0),
        ])
        .unwrap();
        assert!((list.total_duration() - 1.5).abs() < 1e-12);
        assert_eq!(list.total_frames(), 45);
    }
}
