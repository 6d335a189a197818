//! Synthetic amplitude generator
//!
//! Stands in for decoded audio: produces a deterministic, beat-emphasised
//! peak envelope so decks and the waveform renderer have something to show.

use crate::track::Track;
use mixdeck_analysis::BeatGrid;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default waveform resolution (points per second of audio)
pub const DEFAULT_POINTS_PER_SECOND: f64 = 10.0;

/// Deterministic amplitude generator
#[derive(Debug, Clone)]
pub struct SyntheticAmplitudes {
    seed: u64,
    points_per_second: f64,
}

impl SyntheticAmplitudes {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            points_per_second: DEFAULT_POINTS_PER_SECOND,
        }
    }

    /// Set points per second (non-positive values are ignored)
    pub fn with_resolution(mut self, points_per_second: f64) -> Self {
        if points_per_second.is_finite() && points_per_second > 0.0 {
            self.points_per_second = points_per_second;
        }
        self
    }

    /// Generate a peak envelope for a track of the given BPM and duration
    ///
    /// Returns an empty sequence when BPM or duration is unusable.
    pub fn generate(&self, bpm: f64, duration: f64) -> Vec<f32> {
        let Some(grid) = BeatGrid::new(bpm, duration) else {
            return Vec::new();
        };

        let mut rng = StdRng::seed_from_u64(self.seed);
        let count = (duration * self.points_per_second).ceil() as usize;
        // Energy swell over 16 bars
        let swell_period = grid.seconds_per_beat() * 64.0;

        (0..count)
            .map(|i| {
                let t = i as f64 / self.points_per_second;
                let kick = (1.0 - grid.phase_at(t)).powi(3) as f32;
                let swell =
                    (0.85 + 0.15 * (std::f64::consts::TAU * t / swell_period).sin()) as f32;
                let noise: f32 = rng.random_range(0.0..0.2);
                ((0.3 + 0.5 * kick + noise) * swell).clamp(0.0, 1.0)
            })
            .collect()
    }
}

const DEMO_TITLES: [(&str, &str, f64, &str); 6] = [
    ("Night Shift", "Lumen", 124.0, "8A"),
    ("Concrete Bloom", "Vessel Park", 128.0, "5A"),
    ("Afterglow Drive", "Mira Lind", 122.0, "11B"),
    ("Warehouse Tide", "Okan", 130.0, "2A"),
    ("Parallax", "Deep Field", 126.0, "9A"),
    ("Slow Motion City", "Arbor", 118.0, "4B"),
];

/// Build a set of demo tracks with synthetic waveforms
///
/// Ids are `demo-1`, `demo-2`, ... and the titles cycle when `count`
/// exceeds the built-in list.
pub fn demo_tracks(count: usize) -> Vec<Track> {
    (0..count)
        .map(|i| {
            let (title, artist, bpm, key) = DEMO_TITLES[i % DEMO_TITLES.len()];
            let duration = 240.0 + 30.0 * (i % 4) as f64;
            let amplitudes = SyntheticAmplitudes::new(i as u64 + 1).generate(bpm, duration);
            // First downbeat of bar 9 as a seeded cue
            let first_drop = 60.0 / bpm * 32.0;
            Track::new(format!("demo-{}", i + 1), title, artist, bpm, key, duration)
                .with_amplitudes(amplitudes)
                .with_cue_points(vec![0.0, first_drop])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let a = SyntheticAmplitudes::new(7).generate(128.0, 20.0);
        let b = SyntheticAmplitudes::new(7).generate(128.0, 20.0);
        assert_eq!(a, b);
        assert_eq!(a.len(), 200);
    }

    #[test]
    fn test_values_in_range() {
        let amps = SyntheticAmplitudes::new(1)
            .with_resolution(50.0)
            .generate(140.0, 30.0);
        assert!(amps.iter().all(|a| (0.0..=1.0).contains(a)));
    }

    #[test]
    fn test_invalid_input_yields_empty() {
        assert!(SyntheticAmplitudes::new(1).generate(0.0, 30.0).is_empty());
        assert!(SyntheticAmplitudes::new(1).generate(120.0, 0.0).is_empty());
    }

    #[test]
    fn test_demo_tracks_are_valid() {
        let tracks = demo_tracks(8);
        assert_eq!(tracks.len(), 8);
        assert_eq!(tracks[0].id.as_str(), "demo-1");
        for track in &tracks {
            assert!(track.timing().is_ok());
            assert!(!track.amplitudes.is_empty());
        }
    }
}
