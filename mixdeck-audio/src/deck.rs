//! Deck implementation - transport, tempo, sync, cues and loops

use crate::error::{recover_range, EngineError};
use mixdeck_analysis::{BeatGrid, RenderRequest, ViewSize, WaveformGeometry, WaveformSource};
use mixdeck_library::{Track, TrackId, TrackTiming};
use std::fmt;
use std::sync::Arc;

/// Cue markers closer than this are the same marker (seconds)
pub const CUE_TOLERANCE_SECS: f64 = 0.05;
/// Tempo offset range in percent (symmetric)
pub const MAX_TEMPO_OFFSET: f64 = 8.0;

/// Deck identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeckId {
    A,
    B,
}

impl DeckId {
    /// Both decks, in index order
    pub const ALL: [DeckId; 2] = [DeckId::A, DeckId::B];

    /// Get the deck as a numeric index (0 for A, 1 for B)
    pub fn index(&self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }

    /// Get the other deck
    pub fn other(&self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

impl fmt::Display for DeckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

/// Playback state for a deck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// No track loaded
    #[default]
    Empty,
    /// Track loaded, transport stopped
    Paused,
    /// Track loaded and advancing
    Playing,
}

impl PlaybackState {
    pub fn is_loaded(&self) -> bool {
        !matches!(self, Self::Empty)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }
}

/// Loop window `[start, end)` in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopRegion {
    pub start: f64,
    pub end: f64,
}

impl LoopRegion {
    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}

/// Complete deck state for UI rendering
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeckSnapshot {
    pub id: Option<DeckId>,
    pub playback: PlaybackState,
    pub track_id: Option<TrackId>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub key: Option<String>,
    pub playhead: f64,     // seconds
    pub duration: f64,     // seconds, 0 when empty
    pub tempo_offset: f64, // percent
    pub bpm: Option<f64>,  // native BPM
    pub effective_bpm: Option<f64>,
    pub sync: bool,
    pub loop_region: Option<LoopRegion>,
    pub cue_markers: Vec<f64>,
    pub cue_in: f64,
    /// Position within the current beat (0.0 - 1.0)
    pub beat_phase: f64,
}

/// Track as held by a deck, with its validated timing
#[derive(Debug, Clone)]
struct LoadedTrack {
    track: Arc<Track>,
    timing: TrackTiming,
    grid: BeatGrid,
}

/// A single DJ deck
#[derive(Debug, Clone)]
pub struct Deck {
    id: DeckId,
    /// Loaded track (shared with the catalog)
    loaded: Option<LoadedTrack>,
    /// Playback state
    state: PlaybackState,
    /// Current playback position in seconds
    playhead: f64,
    /// Tempo offset in percent (-8.0 - 8.0)
    tempo_offset: f64,
    /// Whether this deck follows the other deck's BPM
    sync: bool,
    /// Active loop
    loop_region: Option<LoopRegion>,
    /// Cue markers in seconds, sorted, no two within CUE_TOLERANCE_SECS
    cue_markers: Vec<f64>,
    /// Position `cue()` returns to
    cue_in: f64,
}

impl Deck {
    /// Create a new empty deck
    pub fn new(id: DeckId) -> Self {
        Self {
            id,
            loaded: None,
            state: PlaybackState::Empty,
            playhead: 0.0,
            tempo_offset: 0.0,
            sync: false,
            loop_region: None,
            cue_markers: Vec::new(),
            cue_in: 0.0,
        }
    }

    pub fn id(&self) -> DeckId {
        self.id
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Check if deck has a track loaded
    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn track(&self) -> Option<&Arc<Track>> {
        self.loaded.as_ref().map(|l| &l.track)
    }

    /// Current position in seconds
    pub fn playhead(&self) -> f64 {
        self.playhead
    }

    /// Track duration in seconds
    pub fn duration(&self) -> Option<f64> {
        self.loaded.as_ref().map(|l| l.timing.duration)
    }

    pub fn tempo_offset(&self) -> f64 {
        self.tempo_offset
    }

    pub fn is_synced(&self) -> bool {
        self.sync
    }

    pub fn loop_region(&self) -> Option<LoopRegion> {
        self.loop_region
    }

    pub fn cue_markers(&self) -> &[f64] {
        &self.cue_markers
    }

    pub fn cue_in(&self) -> f64 {
        self.cue_in
    }

    /// Playback speed multiplier derived from the tempo offset
    pub fn playback_rate(&self) -> f64 {
        1.0 + self.tempo_offset / 100.0
    }

    /// Native BPM of the loaded track
    pub fn bpm(&self) -> Option<f64> {
        self.loaded.as_ref().map(|l| l.timing.bpm)
    }

    /// BPM after the tempo offset: `bpm * (1 + offset / 100)`
    pub fn effective_bpm(&self) -> Option<f64> {
        self.bpm().map(|bpm| bpm * self.playback_rate())
    }

    fn require_loaded(&self) -> Result<&LoadedTrack, EngineError> {
        self.loaded.as_ref().ok_or(EngineError::NoTrackLoaded(self.id))
    }

    /// Load a track
    ///
    /// Resets playhead, loop, sync and cue-in; seeds cue markers from the
    /// track. A rejected track leaves the deck as it was.
    pub fn load(&mut self, track: Arc<Track>) -> Result<(), EngineError> {
        let timing = track.timing()?;
        let grid = BeatGrid::new(timing.bpm, timing.duration)
            .ok_or_else(|| EngineError::InvalidTrack(track_error_fallback(&track)))?;

        self.cue_markers.clear();
        for &seed in &track.cue_points {
            if seed.is_finite() && (0.0..=timing.duration).contains(&seed) {
                insert_marker(&mut self.cue_markers, seed);
            }
        }

        tracing::info!(deck = %self.id, track = %track.id, bpm = timing.bpm, "track loaded");
        self.loaded = Some(LoadedTrack {
            track,
            timing,
            grid,
        });
        self.state = PlaybackState::Paused;
        self.playhead = 0.0;
        self.loop_region = None;
        self.sync = false;
        self.cue_in = 0.0;
        Ok(())
    }

    /// Unload the track, returning it
    ///
    /// The tempo offset is a control value and survives.
    pub fn eject(&mut self) -> Option<Arc<Track>> {
        let loaded = self.loaded.take()?;
        tracing::info!(deck = %self.id, track = %loaded.track.id, "track ejected");
        self.state = PlaybackState::Empty;
        self.playhead = 0.0;
        self.loop_region = None;
        self.sync = false;
        self.cue_markers.clear();
        self.cue_in = 0.0;
        Some(loaded.track)
    }

    /// Start playback
    pub fn play(&mut self) -> Result<(), EngineError> {
        self.require_loaded()?;
        self.state = PlaybackState::Playing;
        Ok(())
    }

    /// Pause playback
    pub fn pause(&mut self) -> Result<(), EngineError> {
        self.require_loaded()?;
        self.state = PlaybackState::Paused;
        Ok(())
    }

    /// Toggle play/pause
    pub fn toggle(&mut self) -> Result<(), EngineError> {
        match self.state {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused | PlaybackState::Empty => self.play(),
        }
    }

    /// Jump to the cue-in point and pause
    pub fn cue(&mut self) -> Result<(), EngineError> {
        self.require_loaded()?;
        self.playhead = self.cue_in;
        self.state = PlaybackState::Paused;
        Ok(())
    }

    /// Set playback position in seconds, clamped to the track
    pub fn seek(&mut self, position_secs: f64) -> Result<(), EngineError> {
        let duration = self.require_loaded()?.timing.duration;
        if position_secs.is_finite() {
            self.playhead = position_secs.clamp(0.0, duration);
        } else {
            tracing::debug!(deck = %self.id, position_secs, "ignoring non-finite seek");
        }
        Ok(())
    }

    /// Set tempo offset in percent
    ///
    /// This is a manual change, so it drops sync.
    pub fn set_tempo(&mut self, offset: f64) {
        if let Some(offset) = recover_range("tempo", offset, -MAX_TEMPO_OFFSET, MAX_TEMPO_OFFSET) {
            self.tempo_offset = offset;
            if self.sync {
                tracing::debug!(deck = %self.id, "manual tempo change, sync off");
                self.sync = false;
            }
        }
    }

    /// Tempo offset that would bring this deck to `target_bpm`, unclamped
    pub fn tempo_for_bpm(&self, target_bpm: f64) -> Option<f64> {
        self.bpm().map(|bpm| (target_bpm / bpm - 1.0) * 100.0)
    }

    /// Turn sync on, matching `target_bpm` when the other deck has one
    pub fn enable_sync(&mut self, target_bpm: Option<f64>) -> Result<(), EngineError> {
        self.require_loaded()?;
        match target_bpm {
            Some(target) => self.follow_bpm(target),
            None => tracing::debug!(deck = %self.id, "sync enabled without a master deck"),
        }
        self.sync = true;
        Ok(())
    }

    /// Turn sync off, keeping the current tempo offset
    pub fn disable_sync(&mut self) {
        self.sync = false;
    }

    /// Re-solve the tempo offset for a new master BPM (sync flag untouched)
    pub(crate) fn follow_bpm(&mut self, target_bpm: f64) {
        let Some(offset) = self.tempo_for_bpm(target_bpm) else {
            return;
        };
        if !offset.is_finite() {
            return;
        }
        if offset.abs() > MAX_TEMPO_OFFSET {
            tracing::warn!(
                deck = %self.id,
                target_bpm,
                offset,
                "sync target outside tempo range, clamping"
            );
        }
        self.tempo_offset = offset.clamp(-MAX_TEMPO_OFFSET, MAX_TEMPO_OFFSET);
    }

    /// Add a cue marker; it also becomes the cue-in point
    pub fn add_cue_point(&mut self, time: f64) -> Result<(), EngineError> {
        let duration = self.require_loaded()?.timing.duration;
        if let Some(time) = recover_range("cue point", time, 0.0, duration) {
            self.cue_in = insert_marker(&mut self.cue_markers, time);
        }
        Ok(())
    }

    /// Remove the cue marker within tolerance of `time`
    ///
    /// Returns whether a marker was removed.
    pub fn remove_cue_point(&mut self, time: f64) -> Result<bool, EngineError> {
        self.require_loaded()?;
        let Some(idx) = find_marker(&self.cue_markers, time) else {
            return Ok(false);
        };
        let removed = self.cue_markers.remove(idx);
        if (removed - self.cue_in).abs() <= CUE_TOLERANCE_SECS {
            self.cue_in = 0.0;
        }
        Ok(true)
    }

    /// Set the loop region; the previous loop is kept on error
    pub fn set_loop(&mut self, start: f64, end: f64) -> Result<(), EngineError> {
        let duration = self.require_loaded()?.timing.duration;
        let valid = start.is_finite() && end.is_finite() && 0.0 <= start && start < end && end <= duration;
        if !valid {
            return Err(EngineError::InvalidLoopRegion {
                deck: self.id,
                start,
                end,
                duration,
            });
        }
        self.loop_region = Some(LoopRegion { start, end });
        Ok(())
    }

    pub fn clear_loop(&mut self) {
        self.loop_region = None;
    }

    /// Advance the playhead by one clock quantum scaled by the tempo
    ///
    /// Wraps inside an active loop when crossing its end; pauses at the end
    /// of the track otherwise.
    pub fn advance(&mut self, quantum_secs: f64) {
        if self.state != PlaybackState::Playing {
            return;
        }
        let Some(duration) = self.duration() else {
            return;
        };

        let previous = self.playhead;
        let next = previous + quantum_secs * self.playback_rate();

        if let Some(region) = self.loop_region {
            if previous < region.end && next >= region.end {
                self.playhead = region.start + (next - region.end) % region.length();
                return;
            }
        }

        if next >= duration {
            self.playhead = duration;
            self.state = PlaybackState::Paused;
            tracing::debug!(deck = %self.id, "end of track");
        } else {
            self.playhead = next;
        }
    }

    /// Position within the current beat (0.0 - 1.0)
    pub fn beat_phase(&self) -> Option<f64> {
        self.loaded.as_ref().map(|l| l.grid.phase_at(self.playhead))
    }

    /// Waveform geometry for the current deck state
    pub fn render(&self, zoom: f64, view: ViewSize) -> WaveformGeometry {
        let Some(loaded) = &self.loaded else {
            return WaveformGeometry::default();
        };
        mixdeck_analysis::render(&RenderRequest {
            source: WaveformSource {
                bpm: loaded.timing.bpm,
                duration: loaded.timing.duration,
                amplitudes: &loaded.track.amplitudes,
            },
            playhead: self.playhead,
            zoom,
            loop_region: self.loop_region.map(|r| (r.start, r.end)),
            cue_markers: &self.cue_markers,
            view,
        })
    }

    /// Get deck state for UI
    pub fn snapshot(&self) -> DeckSnapshot {
        let track = self.track();
        DeckSnapshot {
            id: Some(self.id),
            playback: self.state,
            track_id: track.map(|t| t.id.clone()),
            title: track.map(|t| t.title.clone()),
            artist: track.map(|t| t.artist.clone()),
            key: track.map(|t| t.key.clone()),
            playhead: self.playhead,
            duration: self.duration().unwrap_or(0.0),
            tempo_offset: self.tempo_offset,
            bpm: self.bpm(),
            effective_bpm: self.effective_bpm(),
            sync: self.sync,
            loop_region: self.loop_region,
            cue_markers: self.cue_markers.clone(),
            cue_in: self.cue_in,
            beat_phase: self.beat_phase().unwrap_or(0.0),
        }
    }
}

/// Grid construction fails only for timing that `Track::timing` rejects
fn track_error_fallback(track: &Track) -> mixdeck_library::TrackError {
    mixdeck_library::TrackError::InvalidBpm {
        id: track.id.clone(),
        bpm: track.bpm.unwrap_or(0.0),
    }
}

/// Index of the marker nearest to `time` within tolerance
fn find_marker(markers: &[f64], time: f64) -> Option<usize> {
    markers
        .iter()
        .enumerate()
        .filter(|(_, m)| (*m - time).abs() <= CUE_TOLERANCE_SECS)
        .min_by(|(_, a), (_, b)| (*a - time).abs().total_cmp(&(*b - time).abs()))
        .map(|(i, _)| i)
}

/// Insert keeping order and uniqueness; returns the stored marker
fn insert_marker(markers: &mut Vec<f64>, time: f64) -> f64 {
    if let Some(idx) = find_marker(markers, time) {
        return markers[idx];
    }
    let idx = markers.partition_point(|m| *m < time);
    markers.insert(idx, time);
    time
}
