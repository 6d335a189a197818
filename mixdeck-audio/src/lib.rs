//! Mixer engine for Mixdeck - decks, channels, crossfader and transport
//!
//! This crate models the control plane of a two-deck mixer:
//! - Deck: transport, tempo offset, sync, cue markers and loops
//! - Mixer: channel strips, crossfader curves and VU metering
//! - Clock: the fixed-quantum driver advancing playing decks
//! - Drag: pointer drag sessions for knobs and faders
//! - Engine: command API, per-tick snapshot and the thread handle

mod clock;
mod deck;
mod drag;
mod engine;
mod error;
mod mixer;

pub use clock::{TransportClock, DEFAULT_TICK_RATE_HZ};
pub use deck::{
    Deck, DeckId, DeckSnapshot, LoopRegion, PlaybackState, CUE_TOLERANCE_SECS, MAX_TEMPO_OFFSET,
};
pub use drag::{
    DragAxis, DragId, DragSession, DragSessions, DragTarget, PointerPos, DEFAULT_DRAG_PIXELS,
};
pub use engine::{
    EngineCommand, EngineEvent, EngineHandle, EngineSettings, EngineSnapshot, MixerEngine,
    SnapshotCell, QUEUE_CAPACITY,
};
pub use error::EngineError;
pub use mixer::{
    meter, mix_channels, output_level, Channel, ChannelParam, Crossfader, CrossfaderCurve,
    MixFrame, Mixer, MixerSnapshot, VuReading, CONTROL_MAX, DEFAULT_VU_DECAY,
};
