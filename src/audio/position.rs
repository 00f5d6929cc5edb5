use std::time::Duration;

/// Normalized progress of `elapsed` through a clip of length `duration`.
///
/// Always in `[0, 1]`; an unknown (zero) duration reports `0.0`.
pub fn progress_ratio(elapsed: Duration, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 0.0;
    }
    (elapsed.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
}

/// Position bookkeeping for one playback instance.
///
/// Tracks where the current segment started in the clip and when, so the
/// elapsed position can be recomputed on every tick without a timer.
#[derive(Debug, Clone, Default)]
pub struct PositionTracker {
    /// Offset into the clip at which the current/last segment started
    position: Duration,
    /// Clock reading at segment start
    start_timestamp: Duration,
    /// Clip length, zero until a source reported it
    duration: Duration,
    /// Last computed normalized progress
    progress: f64,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a segment at `offset` with progress rewound to zero
    pub fn start_segment(&mut self, offset: Duration, duration: Duration, now: Duration) {
        self.position = offset;
        self.duration = duration;
        self.start_timestamp = now;
        self.progress = 0.0;
    }

    /// Rewind progress and move the segment offset before a source exists
    pub fn rewind(&mut self, offset: Duration) {
        self.position = offset;
        self.progress = 0.0;
    }

    /// Position in the clip at `now`
    pub fn elapsed(&self, now: Duration, paused: bool) -> Duration {
        if paused {
            self.position
        } else {
            self.position
                .saturating_add(now.saturating_sub(self.start_timestamp))
        }
    }

    /// Freeze the running position, e.g. on pause
    pub fn capture(&mut self, now: Duration) -> Duration {
        self.position = self.elapsed(now, false);
        self.position
    }

    /// Recompute progress for a tick; `None` while the duration is unknown
    pub fn update(&mut self, now: Duration, paused: bool) -> Option<f64> {
        if self.duration.is_zero() {
            return None;
        }
        self.progress = progress_ratio(self.elapsed(now, paused), self.duration);
        Some(self.progress)
    }

    /// Natural completion pins progress at exactly one
    pub fn complete(&mut self) {
        self.progress = 1.0;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn position(&self) -> Duration {
        self.position
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(value: f64) -> Duration {
        Duration::from_secs_f64(value)
    }

    #[test]
    fn test_progress_ratio_bounds() {
        assert_eq!(progress_ratio(secs(2.0), secs(10.0)), 0.2);
        assert_eq!(progress_ratio(secs(11.0), secs(10.0)), 1.0);
        assert_eq!(progress_ratio(Duration::ZERO, secs(10.0)), 0.0);
        assert_eq!(progress_ratio(secs(3.0), Duration::ZERO), 0.0);
    }

    #[test]
    fn test_tracker_creation() {
        let tracker = PositionTracker::new();
        assert_eq!(tracker.position(), Duration::ZERO);
        assert_eq!(tracker.duration(), Duration::ZERO);
        assert_eq!(tracker.progress(), 0.0);
    }

    #[test]
    fn test_update_includes_segment_offset() {
        let mut tracker = PositionTracker::new();
        tracker.start_segment(secs(3.0), secs(10.0), secs(100.0));

        let progress = tracker.update(secs(102.0), false).unwrap();
        assert!((progress - 0.5).abs() < 1e-9);
        assert!((tracker.progress() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_update_clamps_past_end() {
        let mut tracker = PositionTracker::new();
        tracker.start_segment(Duration::ZERO, secs(10.0), Duration::ZERO);

        assert_eq!(tracker.update(secs(11.0), false), Some(1.0));
    }

    #[test]
    fn test_update_with_unknown_duration() {
        let mut tracker = PositionTracker::new();
        tracker.start_segment(Duration::ZERO, Duration::ZERO, Duration::ZERO);

        assert_eq!(tracker.update(secs(5.0), false), None);
        assert_eq!(tracker.progress(), 0.0);
    }

    #[test]
    fn test_capture_freezes_position() {
        let mut tracker = PositionTracker::new();
        tracker.start_segment(secs(1.0), secs(10.0), secs(20.0));

        let captured = tracker.capture(secs(24.0));
        assert_eq!(captured, secs(5.0));

        // Paused elapsed ignores the clock
        assert_eq!(tracker.elapsed(secs(99.0), true), secs(5.0));
        let progress = tracker.update(secs(99.0), true).unwrap();
        assert!((progress - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_clock_before_segment_start_saturates() {
        let mut tracker = PositionTracker::new();
        tracker.start_segment(secs(2.0), secs(10.0), secs(50.0));

        assert_eq!(tracker.elapsed(secs(40.0), false), secs(2.0));
    }

    #[test]
    fn test_complete_and_reset() {
        let mut tracker = PositionTracker::new();
        tracker.start_segment(secs(2.0), secs(10.0), secs(1.0));
        tracker.complete();
        assert_eq!(tracker.progress(), 1.0);

        tracker.reset();
        assert_eq!(tracker.progress(), 0.0);
        assert_eq!(tracker.position(), Duration::ZERO);
        assert_eq!(tracker.duration(), Duration::ZERO);
    }

    #[test]
    fn test_rewind_keeps_duration() {
        let mut tracker = PositionTracker::new();
        tracker.start_segment(Duration::ZERO, secs(8.0), Duration::ZERO);
        tracker.complete();

        tracker.rewind(secs(4.0));
        assert_eq!(tracker.progress(), 0.0);
        assert_eq!(tracker.position(), secs(4.0));
        assert_eq!(tracker.duration(), secs(8.0));
    }
}
