//! Beat grid derived from a track's BPM and duration
//!
//! The grid is purely arithmetic: beat `k` sits at `k * 60 / bpm` seconds,
//! and every fourth beat starts a bar.

/// Beats per bar (4/4 time)
pub const BEATS_PER_BAR: usize = 4;

/// Upper bound on beats a grid enumerates
pub const MAX_GRID_BEATS: usize = 1 << 16;

/// A single beat position on the grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beat {
    /// Beat index from the start of the track
    pub index: usize,
    /// Position in seconds
    pub time: f64,
    /// True when this beat starts a bar
    pub is_bar: bool,
}

/// Represents a beat grid for a track
#[derive(Debug, Clone, PartialEq)]
pub struct BeatGrid {
    /// BPM of the track (native, not tempo-adjusted)
    pub bpm: f64,
    /// Track duration in seconds
    pub duration: f64,
    /// Seconds per beat (cached)
    seconds_per_beat: f64,
}

impl BeatGrid {
    /// Create a new beat grid
    ///
    /// Returns None when bpm or duration is not a positive finite number.
    pub fn new(bpm: f64, duration: f64) -> Option<Self> {
        if !(bpm.is_finite() && bpm > 0.0 && duration.is_finite() && duration > 0.0) {
            return None;
        }
        Some(Self {
            bpm,
            duration,
            seconds_per_beat: 60.0 / bpm,
        })
    }

    /// Seconds between two beats at native tempo
    pub fn seconds_per_beat(&self) -> f64 {
        self.seconds_per_beat
    }

    /// Get the beat number (can be fractional) at a given time
    pub fn beat_at(&self, time: f64) -> f64 {
        time / self.seconds_per_beat
    }

    /// Get the phase (0.0 - 1.0) within the current beat at a given time
    pub fn phase_at(&self, time: f64) -> f64 {
        let beat = self.beat_at(time.max(0.0));
        beat - beat.floor()
    }

    /// Get the time of a specific beat number
    pub fn time_of_beat(&self, beat: usize) -> f64 {
        beat as f64 * self.seconds_per_beat
    }

    /// Number of beats that fit in the track (including beat 0),
    /// capped at [`MAX_GRID_BEATS`]
    pub fn beat_count(&self) -> usize {
        let whole = (self.duration / self.seconds_per_beat).floor();
        if whole >= MAX_GRID_BEATS as f64 {
            MAX_GRID_BEATS
        } else {
            (whole as usize).saturating_add(1).min(MAX_GRID_BEATS)
        }
    }

    /// Iterate all beats from 0 up to the duration
    pub fn beats(&self) -> impl Iterator<Item = Beat> + '_ {
        (0..self.beat_count()).map(move |index| Beat {
            index,
            time: self.time_of_beat(index),
            is_bar: index % BEATS_PER_BAR == 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_positive() {
        assert!(BeatGrid::new(0.0, 100.0).is_none());
        assert!(BeatGrid::new(120.0, -1.0).is_none());
        assert!(BeatGrid::new(f64::NAN, 100.0).is_none());
    }

    #[test]
    fn test_beat_spacing() {
        let grid = BeatGrid::new(120.0, 10.0).unwrap();
        assert!((grid.seconds_per_beat() - 0.5).abs() < 1e-12);

        let beats: Vec<Beat> = grid.beats().collect();
        // 0.0, 0.5, ..., 10.0
        assert_eq!(beats.len(), 21);
        assert!((beats[3].time - 1.5).abs() < 1e-12);
        assert!(beats.last().unwrap().time <= grid.duration);
    }

    #[test]
    fn test_every_fourth_beat_is_bar() {
        let grid = BeatGrid::new(128.0, 30.0).unwrap();
        for beat in grid.beats() {
            assert_eq!(beat.is_bar, beat.index % 4 == 0);
        }
    }

    #[test]
    fn test_beat_count_is_capped() {
        let grid = BeatGrid::new(1e300, 1e300).unwrap();
        assert_eq!(grid.beat_count(), MAX_GRID_BEATS);
        let grid = BeatGrid::new(1e9, 1e9).unwrap();
        assert_eq!(grid.beats().count(), MAX_GRID_BEATS);
    }

    #[test]
    fn test_phase() {
        let grid = BeatGrid::new(120.0, 60.0).unwrap();
        assert!(grid.phase_at(0.0).abs() < 1e-9);
        assert!((grid.phase_at(0.25) - 0.5).abs() < 1e-9);
        assert!((grid.phase_at(1.125) - 0.25).abs() < 1e-9);
    }
}
