//! Mixdeck - headless two-deck mixer
//!
//! Reads text commands from stdin, runs the engine on a single timeline
//! thread and prints deck status on request.

use std::io::{self, BufRead};
use std::thread;

use crossbeam_channel::{select, Receiver, Sender};
use tracing_subscriber::EnvFilter;

use mixdeck_audio::{
    CrossfaderCurve, DeckId, DeckSnapshot, EngineCommand, EngineEvent, EngineHandle, EngineSettings,
    EngineSnapshot, MixerEngine, PlaybackState, SnapshotCell,
};
use mixdeck_input::{parse_command, Dispatch, HELP};
use mixdeck_library::{demo_tracks, ChannelExportSink, Config, ExportRequest, TrackCatalog};

/// Pending export requests the renderer may lag behind by
const EXPORT_QUEUE: usize = 16;

fn main() -> anyhow::Result<()> {
    init_logging();

    let mut config = Config::load();
    let settings = EngineSettings::from_config(&config);
    let catalog: TrackCatalog = demo_tracks(config.demo_tracks).into_iter().collect();
    tracing::info!(
        tracks = catalog.len(),
        tick_rate_hz = config.tick_rate_hz,
        curve = %settings.crossfader_curve,
        "mixdeck starting"
    );

    // Create engine channels
    let (cmd_tx, cmd_rx, evt_tx, evt_rx) = EngineHandle::create_channels();
    let snapshots = SnapshotCell::new();

    // Export requests go to a renderer thread; the engine only validates them
    let (export_sink, export_rx) = ChannelExportSink::new(EXPORT_QUEUE);
    let renderer_handle = thread::Builder::new()
        .name("export-renderer".into())
        .spawn(move || run_export_renderer(export_rx))?;

    let engine = MixerEngine::new(settings).with_export_sink(Box::new(export_sink));
    let timeline_snapshots = snapshots.clone();
    let timeline_handle = thread::Builder::new()
        .name("timeline".into())
        .spawn(move || run_timeline(engine, cmd_rx, evt_tx, timeline_snapshots))?;

    // Stdin is read on its own thread so the main loop can also drain events
    let (line_tx, line_rx) = crossbeam_channel::bounded::<String>(64);
    thread::Builder::new()
        .name("stdin".into())
        .spawn(move || read_lines(line_tx))?;

    let engine = EngineHandle::new(cmd_tx, evt_rx, snapshots);
    println!("mixdeck ready - {} tracks, type `help` for commands", catalog.len());
    let result = run_app(&engine, &catalog, &line_rx, &mut config);

    // Cleanup
    engine.shutdown();
    let _ = timeline_handle.join();
    let _ = renderer_handle.join();

    result
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_lines(line_tx: Sender<String>) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        match line {
            Ok(line) => {
                if line_tx.send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed");
                break;
            }
        }
    }
}

/// Timeline loop: applies commands between ticks and publishes snapshots
fn run_timeline(
    mut engine: MixerEngine,
    cmd_rx: Receiver<EngineCommand>,
    evt_tx: Sender<EngineEvent>,
    snapshots: SnapshotCell,
) {
    let ticker = crossbeam_channel::tick(engine.clock().quantum_duration());
    snapshots.publish(engine.snapshot());

    loop {
        select! {
            recv(cmd_rx) -> cmd => {
                let cmd = match cmd {
                    Ok(EngineCommand::Shutdown) | Err(_) => break,
                    Ok(cmd) => cmd,
                };
                let event = match engine.handle_command(cmd) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(error = %e, "command rejected");
                        Some(EngineEvent::Error(e))
                    }
                };
                if let Some(event) = event {
                    let _ = evt_tx.try_send(event);
                }
                snapshots.publish(engine.snapshot());
            }
            recv(ticker) -> _ => {
                engine.tick();
                snapshots.publish(engine.snapshot());
            }
        }
    }

    tracing::debug!(ticks = engine.clock().ticks(), "timeline stopped");
}

/// Stand-in rendering collaborator: logs what it would render
fn run_export_renderer(export_rx: Receiver<ExportRequest>) {
    for request in export_rx.iter() {
        match request.options.file_name_for(&request.track) {
            Ok(file_name) => tracing::info!(
                track = %request.track.id,
                file = %file_name,
                formats = ?request.options.formats,
                metadata = ?request.options.metadata,
                "export request received"
            ),
            Err(e) => tracing::warn!(track = %request.track.id, error = %e, "unusable export request"),
        }
    }
}

fn run_app(
    engine: &EngineHandle,
    catalog: &TrackCatalog,
    line_rx: &Receiver<String>,
    config: &mut Config,
) -> anyhow::Result<()> {
    loop {
        select! {
            recv(line_rx) -> line => {
                // Stdin closed
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let dispatch = parse_command(&line).and_then(|cmd| cmd.resolve(catalog));
                match dispatch {
                    Ok(Dispatch::Engine(cmd)) => {
                        let curve = match &cmd {
                            EngineCommand::SetCrossfaderCurve(curve) => Some(*curve),
                            _ => None,
                        };
                        if !engine.send(cmd) {
                            println!("engine busy, command dropped");
                        } else if let Some(curve) = curve {
                            remember_curve(config, curve);
                        }
                    }
                    Ok(Dispatch::Status) => println!("{}", format_status(&engine.snapshots.read())),
                    Ok(Dispatch::Tracks) => {
                        for track in catalog.iter() {
                            println!(
                                "{:<10} {} - {} ({} bpm, {})",
                                track.id.as_str(),
                                track.artist,
                                track.title,
                                track.bpm.map(|b| format!("{:.1}", b)).unwrap_or_else(|| "?".into()),
                                track.key
                            );
                        }
                    }
                    Ok(Dispatch::Help) => println!("{}", HELP),
                    Ok(Dispatch::Quit) => break,
                    Err(e) => println!("error: {}", e),
                }
            }
            recv(engine.event_rx) -> event => {
                match event {
                    Ok(event) => report_event(&event),
                    Err(_) => anyhow::bail!("engine stopped unexpectedly"),
                }
            }
        }
    }
    Ok(())
}

/// Persist the crossfader curve as the default for the next start
fn remember_curve(config: &mut Config, curve: CrossfaderCurve) {
    config.crossfader_curve = curve.to_string();
    // Best effort, a read-only config dir should not stop the mix
    if let Err(e) = config.save() {
        tracing::warn!(error = %e, "could not save config");
    }
}

fn report_event(event: &EngineEvent) {
    match event {
        EngineEvent::TrackLoaded { deck, track } => println!("deck {}: loaded {}", deck, track),
        EngineEvent::TrackEjected { deck, track } => println!("deck {}: ejected {}", deck, track),
        EngineEvent::SyncChanged { deck, enabled } => {
            println!("deck {}: sync {}", deck, if *enabled { "on" } else { "off" })
        }
        EngineEvent::DragStarted { id, target } => println!("drag {} started on {:?}", id, target),
        EngineEvent::ExportForwarded { track } => println!("export of {} forwarded", track),
        EngineEvent::Error(e) => println!("error: {}", e),
    }
}

fn format_status(snapshot: &EngineSnapshot) -> String {
    let mixer = &snapshot.mixer;
    let mut lines = vec![format!(
        "t={:.2}s tick {} | xfader {:.0} ({}) | out A {:.2} B {:.2}",
        snapshot.time,
        snapshot.tick,
        mixer.crossfader.position,
        mixer.crossfader.curve,
        mixer.output_a,
        mixer.output_b
    )];
    for id in DeckId::ALL {
        lines.push(format_deck(id, snapshot.deck(id), mixer.vu.get(id)));
    }
    lines.join("\n")
}

fn format_deck(id: DeckId, deck: &DeckSnapshot, vu: f32) -> String {
    let state = match deck.playback {
        PlaybackState::Empty => return format!("{} empty", id),
        PlaybackState::Paused => "paused",
        PlaybackState::Playing => "playing",
    };
    let mut line = format!(
        "{} {:<7} {} {:>6.1}/{:.1}s {:.2} bpm ({:+.2}%)",
        id,
        state,
        deck.track_id.as_ref().map(|t| t.as_str()).unwrap_or("-"),
        deck.playhead,
        deck.duration,
        deck.effective_bpm.unwrap_or(0.0),
        deck.tempo_offset
    );
    if deck.sync {
        line.push_str(" sync");
    }
    if let Some(region) = deck.loop_region {
        line.push_str(&format!(" loop {:.2}-{:.2}", region.start, region.end));
    }
    if !deck.cue_markers.is_empty() {
        let cues: Vec<String> = deck.cue_markers.iter().map(|c| format!("{:.2}", c)).collect();
        line.push_str(&format!(" cues [{}]", cues.join(", ")));
    }
    line.push_str(&format!(" vu {:.2}", vu));
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixdeck_library::Track;
    use std::sync::Arc;
    use std::time::Duration;

    fn spawn_timeline() -> (
        Sender<EngineCommand>,
        Receiver<EngineEvent>,
        SnapshotCell,
        thread::JoinHandle<()>,
    ) {
        let (cmd_tx, cmd_rx, evt_tx, evt_rx) = EngineHandle::create_channels();
        let snapshots = SnapshotCell::new();
        let cell = snapshots.clone();
        let handle = thread::spawn(move || run_timeline(MixerEngine::default(), cmd_rx, evt_tx, cell));
        (cmd_tx, evt_rx, snapshots, handle)
    }

    #[test]
    fn test_timeline_applies_commands() {
        let (cmd_tx, evt_rx, snapshots, handle) = spawn_timeline();
        let track = Arc::new(Track::new("t1", "T", "A", 128.0, "8A", 300.0));
        cmd_tx.send(EngineCommand::LoadTrack(DeckId::A, track)).unwrap();
        cmd_tx.send(EngineCommand::Play(DeckId::B)).unwrap();
        cmd_tx.send(EngineCommand::Shutdown).unwrap();
        handle.join().unwrap();

        assert!(matches!(
            evt_rx.recv_timeout(Duration::from_secs(1)),
            Ok(EngineEvent::TrackLoaded { deck: DeckId::A, .. })
        ));
        assert!(matches!(
            evt_rx.recv_timeout(Duration::from_secs(1)),
            Ok(EngineEvent::Error(_))
        ));
        let snapshot = snapshots.read();
        assert_eq!(snapshot.deck(DeckId::A).playback, PlaybackState::Paused);
    }

    #[test]
    fn test_timeline_ticks() {
        let (cmd_tx, _evt_rx, snapshots, handle) = spawn_timeline();
        thread::sleep(Duration::from_millis(200));
        cmd_tx.send(EngineCommand::Shutdown).unwrap();
        handle.join().unwrap();
        assert!(snapshots.read().tick > 0);
    }

    #[test]
    fn test_format_status() {
        let mut engine = MixerEngine::default();
        engine
            .load_track(
                DeckId::B,
                Arc::new(Track::new("t2", "T", "A", 120.0, "1A", 60.0)),
            )
            .unwrap();
        engine.handle_command(EngineCommand::AddCue(DeckId::B, 4.0)).unwrap();
        let status = format_status(&engine.snapshot());
        assert!(status.contains("A empty"));
        assert!(status.contains("B paused"));
        assert!(status.contains("cues [4.00]"));
    }
}
