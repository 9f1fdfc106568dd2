// Scrobble eligibility tracking for the now-playing track

use super::traits::TrackSubmission;
use std::time::Duration;

/// Tracks shorter than this are never scrobbled
pub const MIN_TRACK_DURATION: Duration = Duration::from_secs(30);

/// Eligibility threshold ceiling in seconds (4 minutes)
pub const SCROBBLE_TIME_THRESHOLD: u64 = 240;

#[derive(Debug, Clone, PartialEq, Eq)]
enum TrackerState {
    Idle,
    Tracking {
        track: TrackSubmission,
        elapsed: u64,
        last_marker: Option<u64>,
        threshold: u64,
    },
    /// Already handed to the queue; further ticks are ignored
    Eligible,
}

/// Counts distinct playback ticks until the track has been played long enough.
///
/// Every tick with a new marker counts as one second no matter how far the
/// marker jumped, so irregular tick delivery never double counts.
#[derive(Debug)]
pub struct EligibilityTracker {
    state: TrackerState,
}

impl Default for EligibilityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl EligibilityTracker {
    pub fn new() -> Self {
        Self {
            state: TrackerState::Idle,
        }
    }

    /// Seconds of play required for a track of length `total`:
    /// half the length, capped at 4 minutes, at least one second
    pub fn threshold_for(total: Duration) -> u64 {
        let half = total.as_millis() as u64 / 2000;
        half.min(SCROBBLE_TIME_THRESHOLD).max(1)
    }

    /// Begin tracking `track`. Returns false, leaving the tracker idle, when
    /// the track is shorter than 30 seconds.
    pub fn start(&mut self, track: TrackSubmission, total: Duration) -> bool {
        if total < MIN_TRACK_DURATION {
            log::debug!("Not tracking {}: shorter than {}s", track, MIN_TRACK_DURATION.as_secs());
            self.state = TrackerState::Idle;
            return false;
        }

        let threshold = Self::threshold_for(total);
        log::debug!("Tracking {} (scrobble after {}s)", track, threshold);

        self.state = TrackerState::Tracking {
            track,
            elapsed: 0,
            last_marker: None,
            threshold,
        };
        true
    }

    /// Record a playback tick. Returns the track exactly once, on the tick
    /// that reaches the threshold.
    pub fn on_tick(&mut self, marker: u64) -> Option<TrackSubmission> {
        let TrackerState::Tracking {
            elapsed,
            last_marker,
            threshold,
            ..
        } = &mut self.state
        else {
            return None;
        };

        if *last_marker == Some(marker) {
            return None;
        }

        *elapsed += 1;
        *last_marker = Some(marker);

        if *elapsed < *threshold {
            return None;
        }

        match std::mem::replace(&mut self.state, TrackerState::Eligible) {
            TrackerState::Tracking { track, elapsed, .. } => {
                log::info!("{} is eligible after {}s", track, elapsed);
                Some(track)
            }
            _ => None,
        }
    }

    /// Drop any in-progress tracking without submitting
    pub fn reset(&mut self) {
        self.state = TrackerState::Idle;
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.state, TrackerState::Tracking { .. })
    }

    /// Distinct ticks counted for the current track
    pub fn elapsed(&self) -> u64 {
        match &self.state {
            TrackerState::Tracking { elapsed, .. } => *elapsed,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrobbler::traits::TrackMetadata;

    fn track(total: Duration) -> TrackSubmission {
        let metadata = TrackMetadata {
            artist: "A".to_string(),
            title: "B".to_string(),
            album: None,
        };
        TrackSubmission::new(&metadata, total, 0).unwrap()
    }

    fn ticks_until_eligible(tracker: &mut EligibilityTracker, limit: u64) -> Option<u64> {
        (1..=limit).find(|marker| tracker.on_tick(*marker * 1000).is_some())
    }

    #[test]
    fn test_threshold_is_half_capped_at_240() {
        assert_eq!(EligibilityTracker::threshold_for(Duration::from_secs(30)), 15);
        assert_eq!(EligibilityTracker::threshold_for(Duration::from_secs(301)), 150);
        assert_eq!(EligibilityTracker::threshold_for(Duration::from_secs(480)), 240);
        assert_eq!(EligibilityTracker::threshold_for(Duration::from_secs(3600)), 240);
        assert_eq!(EligibilityTracker::threshold_for(Duration::from_millis(500)), 1);
    }

    #[test]
    fn test_short_track_never_eligible() {
        let total = Duration::from_secs(29);
        let mut tracker = EligibilityTracker::new();

        assert!(!tracker.start(track(total), total));
        assert_eq!(ticks_until_eligible(&mut tracker, 1000), None);
    }

    #[test]
    fn test_eligible_after_exact_threshold() {
        for seconds in [30u64, 31, 100, 300, 479, 480, 1200] {
            let total = Duration::from_secs(seconds);
            let mut tracker = EligibilityTracker::new();
            assert!(tracker.start(track(total), total));

            let expected = (seconds / 2).min(240);
            assert_eq!(ticks_until_eligible(&mut tracker, 1000), Some(expected));
        }
    }

    #[test]
    fn test_duplicate_markers_do_not_count() {
        let total = Duration::from_secs(300);
        let mut tracker = EligibilityTracker::new();
        tracker.start(track(total), total);

        tracker.on_tick(1000);
        tracker.on_tick(1000);
        tracker.on_tick(1000);
        assert_eq!(tracker.elapsed(), 1);

        tracker.on_tick(9000);
        assert_eq!(tracker.elapsed(), 2);
    }

    #[test]
    fn test_track_is_handed_over_once() {
        let total = Duration::from_secs(60);
        let mut tracker = EligibilityTracker::new();
        tracker.start(track(total), total);

        let handed: Vec<_> = (1..=100).filter_map(|m| tracker.on_tick(m)).collect();
        assert_eq!(handed.len(), 1);
        assert!(!tracker.is_tracking());
    }

    #[test]
    fn test_reset_discards_progress() {
        let total = Duration::from_secs(60);
        let mut tracker = EligibilityTracker::new();
        tracker.start(track(total), total);

        for marker in 1..=29 {
            assert!(tracker.on_tick(marker).is_none());
        }
        tracker.reset();

        assert!(!tracker.is_tracking());
        assert!(tracker.on_tick(30).is_none());
    }
}
