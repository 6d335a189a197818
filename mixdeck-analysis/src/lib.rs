//! Visual analysis for Mixdeck
//!
//! Provides the beat grid and the waveform geometry renderer used to draw
//! a deck's track, playhead, cue flags and loop band.

mod beatgrid;
mod waveform;

pub use beatgrid::{Beat, BeatGrid, BEATS_PER_BAR, MAX_GRID_BEATS};
pub use waveform::{
    effective_zoom, render, resample, AmplitudeBar, BeatLine, CueFlag, LoopBand, Point,
    RenderRequest, ViewSize, WaveformGeometry, WaveformSource, CUE_FLAG_HEIGHT, CUE_FLAG_WIDTH,
    LOOP_BAND_OPACITY, MAX_ZOOM,
};
