//! Track records supplied by the catalog

use std::fmt;
use thiserror::Error;

/// Errors for track records that cannot be played
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackError {
    #[error("track {0} has no BPM")]
    MissingBpm(TrackId),
    #[error("track {id} has invalid BPM {bpm}")]
    InvalidBpm { id: TrackId, bpm: f64 },
    #[error("track {0} has no duration")]
    MissingDuration(TrackId),
    #[error("track {id} has invalid duration {duration}s")]
    InvalidDuration { id: TrackId, duration: f64 },
}

/// Catalog identifier of a track
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Validated timing of a track, guaranteed positive and finite
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackTiming {
    pub bpm: f64,
    pub duration: f64,
}

/// Immutable track record
///
/// BPM and duration are optional because catalog records can be incomplete;
/// [`Track::timing`] is the gate every consumer goes through.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    pub bpm: Option<f64>,
    /// Musical key, e.g. "8A" or "F#m"
    pub key: String,
    /// Duration in seconds
    pub duration_secs: Option<f64>,
    /// Peak amplitudes (0.0-1.0) spread evenly over the duration
    pub amplitudes: Vec<f32>,
    /// Seeded cue points in seconds
    pub cue_points: Vec<f64>,
}

impl Track {
    /// Create a track record without waveform data or cue points
    pub fn new(
        id: impl Into<TrackId>,
        title: impl Into<String>,
        artist: impl Into<String>,
        bpm: f64,
        key: impl Into<String>,
        duration_secs: f64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            bpm: Some(bpm),
            key: key.into(),
            duration_secs: Some(duration_secs),
            amplitudes: Vec::new(),
            cue_points: Vec::new(),
        }
    }

    pub fn with_amplitudes(mut self, amplitudes: Vec<f32>) -> Self {
        self.amplitudes = amplitudes;
        self
    }

    pub fn with_cue_points(mut self, cue_points: Vec<f64>) -> Self {
        self.cue_points = cue_points;
        self
    }

    /// Validate BPM and duration
    pub fn timing(&self) -> Result<TrackTiming, TrackError> {
        let bpm = self.bpm.ok_or_else(|| TrackError::MissingBpm(self.id.clone()))?;
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(TrackError::InvalidBpm {
                id: self.id.clone(),
                bpm,
            });
        }

        let duration = self
            .duration_secs
            .ok_or_else(|| TrackError::MissingDuration(self.id.clone()))?;
        if !duration.is_finite() || duration <= 0.0 {
            return Err(TrackError::InvalidDuration {
                id: self.id.clone(),
                duration,
            });
        }

        Ok(TrackTiming { bpm, duration })
    }
}

impl From<String> for TrackId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
