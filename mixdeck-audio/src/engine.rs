//! Mixer engine - orchestrates decks, mixer, transport clock and drags

use crate::clock::TransportClock;
use crate::deck::{Deck, DeckId, DeckSnapshot};
use crate::drag::{DragId, DragSessions, DragTarget, PointerPos, DEFAULT_DRAG_PIXELS};
use crate::error::EngineError;
use crate::mixer::{
    Channel, ChannelParam, CrossfaderCurve, MixFrame, Mixer, MixerSnapshot, DEFAULT_VU_DECAY,
};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use mixdeck_analysis::{ViewSize, WaveformGeometry};
use mixdeck_library::{forward_export, Config, ExportOptions, ExportSink, Track, TrackId};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// Capacity of the command and event queues
pub const QUEUE_CAPACITY: usize = 1024;

/// Engine tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub tick_quantum: Duration,
    pub vu_decay: f32,
    pub drag_pixels: f32,
    pub crossfader_curve: CrossfaderCurve,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_quantum: TransportClock::default().quantum_duration(),
            vu_decay: DEFAULT_VU_DECAY,
            drag_pixels: DEFAULT_DRAG_PIXELS,
            crossfader_curve: CrossfaderCurve::default(),
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        let crossfader_curve = config
            .crossfader_curve
            .parse::<CrossfaderCurve>()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to smooth crossfader curve");
                CrossfaderCurve::default()
            });
        Self {
            tick_quantum: config.tick_quantum(),
            vu_decay: config.vu_decay,
            drag_pixels: config.drag_pixels,
            crossfader_curve,
        }
    }
}

/// Commands sent to the engine
#[derive(Debug, Clone)]
pub enum EngineCommand {
    // Deck commands
    LoadTrack(DeckId, Arc<Track>),
    Eject(DeckId),
    Play(DeckId),
    Pause(DeckId),
    Toggle(DeckId),
    Cue(DeckId),
    Seek(DeckId, f64),
    /// Toggle sync on the deck
    Sync(DeckId),
    SetTempo(DeckId, f64),
    AddCue(DeckId, f64),
    RemoveCue(DeckId, f64),
    SetLoop(DeckId, f64, f64),
    ClearLoop(DeckId),

    // Mixer commands
    SetChannel(DeckId, Channel),
    SetChannelParam(DeckId, ChannelParam, f32),
    SetCrossfader(f32),
    SetCrossfaderCurve(CrossfaderCurve),

    // Pointer drags
    BeginDrag { target: DragTarget, origin: PointerPos },
    DragMove { id: DragId, pointer: PointerPos },
    EndDrag(DragId),

    Export { track: Arc<Track>, options: ExportOptions },

    // System
    Shutdown,
}

/// Events sent from the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    TrackLoaded { deck: DeckId, track: TrackId },
    TrackEjected { deck: DeckId, track: TrackId },
    SyncChanged { deck: DeckId, enabled: bool },
    DragStarted { id: DragId, target: DragTarget },
    ExportForwarded { track: TrackId },
    /// A command was rejected
    Error(EngineError),
}

/// Read-only engine state published once per tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineSnapshot {
    pub tick: u64,
    /// Model time in seconds
    pub time: f64,
    pub decks: [DeckSnapshot; 2],
    pub mixer: MixerSnapshot,
}

impl EngineSnapshot {
    pub fn deck(&self, deck: DeckId) -> &DeckSnapshot {
        &self.decks[deck.index()]
    }
}

/// Engine state (held in the timeline thread)
pub struct MixerEngine {
    decks: [Deck; 2],
    mixer: Mixer,
    clock: TransportClock,
    drags: DragSessions,
    export_sink: Option<Box<dyn ExportSink>>,
}

impl Default for MixerEngine {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

impl MixerEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            decks: [Deck::new(DeckId::A), Deck::new(DeckId::B)],
            mixer: Mixer::new(settings.vu_decay, settings.crossfader_curve),
            clock: TransportClock::new(settings.tick_quantum),
            drags: DragSessions::new(settings.drag_pixels),
            export_sink: None,
        }
    }

    /// Attach the rendering collaborator that receives export requests
    pub fn with_export_sink(mut self, sink: Box<dyn ExportSink>) -> Self {
        self.export_sink = Some(sink);
        self
    }

    pub fn deck(&self, deck: DeckId) -> &Deck {
        &self.decks[deck.index()]
    }

    fn deck_mut(&mut self, deck: DeckId) -> &mut Deck {
        &mut self.decks[deck.index()]
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    pub fn clock(&self) -> &TransportClock {
        &self.clock
    }

    pub fn drags(&self) -> &DragSessions {
        &self.drags
    }

    /// Process a command
    ///
    /// Rejected commands leave the engine unchanged and return the error;
    /// recoverable anomalies (clamped values, stale drags) are only logged.
    pub fn handle_command(&mut self, cmd: EngineCommand) -> Result<Option<EngineEvent>, EngineError> {
        let event = match cmd {
            EngineCommand::LoadTrack(deck, track) => {
                let id = track.id.clone();
                self.load_track(deck, track)?;
                Some(EngineEvent::TrackLoaded { deck, track: id })
            }
            EngineCommand::Eject(deck) => self
                .eject(deck)
                .map(|track| EngineEvent::TrackEjected { deck, track }),
            EngineCommand::Play(deck) => {
                self.deck_mut(deck).play()?;
                None
            }
            EngineCommand::Pause(deck) => {
                self.deck_mut(deck).pause()?;
                None
            }
            EngineCommand::Toggle(deck) => {
                self.deck_mut(deck).toggle()?;
                None
            }
            EngineCommand::Cue(deck) => {
                self.deck_mut(deck).cue()?;
                None
            }
            EngineCommand::Seek(deck, position) => {
                self.deck_mut(deck).seek(position)?;
                None
            }
            EngineCommand::Sync(deck) => {
                let enabled = self.toggle_sync(deck)?;
                Some(EngineEvent::SyncChanged { deck, enabled })
            }
            EngineCommand::SetTempo(deck, offset) => {
                self.set_tempo(deck, offset);
                None
            }
            EngineCommand::AddCue(deck, time) => {
                self.deck_mut(deck).add_cue_point(time)?;
                None
            }
            EngineCommand::RemoveCue(deck, time) => {
                if !self.deck_mut(deck).remove_cue_point(time)? {
                    tracing::debug!(%deck, time, "no cue marker to remove");
                }
                None
            }
            EngineCommand::SetLoop(deck, start, end) => {
                self.deck_mut(deck).set_loop(start, end)?;
                None
            }
            EngineCommand::ClearLoop(deck) => {
                self.deck_mut(deck).clear_loop();
                None
            }

            EngineCommand::SetChannel(deck, values) => {
                self.mixer.set_channel(deck, values);
                None
            }
            EngineCommand::SetChannelParam(deck, param, value) => {
                self.mixer.set_channel_param(deck, param, value);
                None
            }
            EngineCommand::SetCrossfader(position) => {
                self.mixer.set_crossfader(position);
                None
            }
            EngineCommand::SetCrossfaderCurve(curve) => {
                self.mixer.set_curve(curve);
                None
            }

            EngineCommand::BeginDrag { target, origin } => {
                let id = self.begin_drag(target, origin);
                Some(EngineEvent::DragStarted { id, target })
            }
            EngineCommand::DragMove { id, pointer } => {
                self.drag_move(id, pointer);
                None
            }
            EngineCommand::EndDrag(id) => {
                self.end_drag(id);
                None
            }

            EngineCommand::Export { track, options } => {
                let id = track.id.clone();
                self.export(track, options)?;
                Some(EngineEvent::ExportForwarded { track: id })
            }

            EngineCommand::Shutdown => None, // Handled at higher level
        };
        Ok(event)
    }

    /// Load a track onto a deck
    ///
    /// In-flight drags on the deck end; its channel strip is untouched.
    pub fn load_track(&mut self, deck: DeckId, track: Arc<Track>) -> Result<(), EngineError> {
        self.deck_mut(deck).load(track)?;
        self.drags.invalidate_deck(deck);
        self.follow_master(deck);
        Ok(())
    }

    /// Eject a deck, returning the id of the track it held
    pub fn eject(&mut self, deck: DeckId) -> Option<TrackId> {
        self.drags.invalidate_deck(deck);
        self.deck_mut(deck).eject().map(|track| track.id.clone())
    }

    /// Toggle sync; returns the new sync state
    pub fn toggle_sync(&mut self, deck: DeckId) -> Result<bool, EngineError> {
        if self.deck(deck).is_synced() {
            self.deck_mut(deck).disable_sync();
            tracing::info!(%deck, "sync off");
            return Ok(false);
        }
        let target = self.deck(deck.other()).effective_bpm();
        self.deck_mut(deck).enable_sync(target)?;
        tracing::info!(%deck, target_bpm = ?target, "sync on");
        Ok(true)
    }

    /// Manual tempo change; a synced partner follows
    pub fn set_tempo(&mut self, deck: DeckId, offset: f64) {
        self.deck_mut(deck).set_tempo(offset);
        self.follow_master(deck);
    }

    /// Re-match the other deck if it is synced to `master`
    fn follow_master(&mut self, master: DeckId) {
        let Some(bpm) = self.deck(master).effective_bpm() else {
            return;
        };
        let follower = self.deck_mut(master.other());
        if follower.is_synced() {
            follower.follow_bpm(bpm);
        }
    }

    /// Current value of a drag target
    pub fn control_value(&self, target: DragTarget) -> f64 {
        match target {
            DragTarget::Channel(deck, param) => self.mixer.channel(deck).get(param) as f64,
            DragTarget::Tempo(deck) => self.deck(deck).tempo_offset(),
            DragTarget::Crossfader => self.mixer.crossfader().position as f64,
        }
    }

    pub fn begin_drag(&mut self, target: DragTarget, origin: PointerPos) -> DragId {
        let start = self.control_value(target);
        self.drags.begin(target, start, origin)
    }

    /// Apply a pointer move; false if the session no longer exists
    pub fn drag_move(&mut self, id: DragId, pointer: PointerPos) -> bool {
        let (target, value) = match self.drags.value_for(id, pointer) {
            Ok(update) => update,
            Err(e) => {
                tracing::debug!(error = %e, "ignoring drag move");
                return false;
            }
        };
        match target {
            DragTarget::Channel(deck, param) => self.mixer.set_channel_param(deck, param, value as f32),
            DragTarget::Tempo(deck) => self.set_tempo(deck, value),
            DragTarget::Crossfader => self.mixer.set_crossfader(value as f32),
        }
        true
    }

    pub fn end_drag(&mut self, id: DragId) -> bool {
        self.drags.end(id)
    }

    /// Validate an export request and hand it to the export sink
    pub fn export(&self, track: Arc<Track>, options: ExportOptions) -> Result<(), EngineError> {
        let sink = self.export_sink.as_deref().ok_or(EngineError::ExportUnavailable)?;
        forward_export(sink, track, options)?;
        Ok(())
    }

    /// Advance one clock quantum and re-evaluate the mix
    pub fn tick(&mut self) -> MixFrame {
        self.clock.tick(&mut self.decks);
        let live = [self.decks[0].is_playing(), self.decks[1].is_playing()];
        self.mixer.tick(live)
    }

    /// Waveform geometry for a deck
    pub fn render(&self, deck: DeckId, zoom: f64, view: ViewSize) -> WaveformGeometry {
        self.deck(deck).render(zoom, view)
    }

    /// Generate current state for UI
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            tick: self.clock.ticks(),
            time: self.clock.elapsed(),
            decks: [self.decks[0].snapshot(), self.decks[1].snapshot()],
            mixer: self.mixer.snapshot(),
        }
    }
}

/// Shared cell the timeline publishes snapshots into
#[derive(Debug, Clone, Default)]
pub struct SnapshotCell {
    inner: Arc<RwLock<EngineSnapshot>>,
}

impl SnapshotCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: EngineSnapshot) {
        *self.inner.write() = snapshot;
    }

    /// Copy of the latest snapshot
    pub fn read(&self) -> EngineSnapshot {
        self.inner.read().clone()
    }

    /// Run `f` against the latest snapshot without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&EngineSnapshot) -> R) -> R {
        f(&self.inner.read())
    }
}

/// Handle to communicate with the engine
pub struct EngineHandle {
    /// Send commands to the timeline thread
    pub command_tx: Sender<EngineCommand>,
    /// Receive events from the timeline thread
    pub event_rx: Receiver<EngineEvent>,
    /// Latest published snapshot
    pub snapshots: SnapshotCell,
}

impl EngineHandle {
    /// Create channels for engine communication
    pub fn create_channels() -> (
        Sender<EngineCommand>,
        Receiver<EngineCommand>,
        Sender<EngineEvent>,
        Receiver<EngineEvent>,
    ) {
        let (cmd_tx, cmd_rx) = bounded(QUEUE_CAPACITY);
        let (evt_tx, evt_rx) = bounded(QUEUE_CAPACITY);
        (cmd_tx, cmd_rx, evt_tx, evt_rx)
    }

    pub fn new(
        command_tx: Sender<EngineCommand>,
        event_rx: Receiver<EngineEvent>,
        snapshots: SnapshotCell,
    ) -> Self {
        Self {
            command_tx,
            event_rx,
            snapshots,
        }
    }

    /// Queue a command; false if it was dropped
    pub fn send(&self, cmd: EngineCommand) -> bool {
        match self.command_tx.try_send(cmd) {
            Ok(()) => true,
            Err(TrySendError::Full(cmd)) => {
                tracing::warn!(?cmd, "command queue full, dropping command");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Request shutdown
    ///
    /// Blocks while the command queue is full so the request is never
    /// dropped; returns immediately if the timeline is already gone.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(EngineCommand::Shutdown);
    }
}
