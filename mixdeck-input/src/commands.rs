//! Command definitions and the text command parser for Mixdeck

use mixdeck_audio::{Channel, ChannelParam, CrossfaderCurve, DeckId, EngineCommand, CONTROL_MAX};
use mixdeck_library::{ExportFormats, ExportMetadata, ExportOptions, TrackCatalog, TrackId};
use std::str::SplitWhitespace;
use thiserror::Error;

/// Usage text printed by `help`
pub const HELP: &str = "\
load <deck> <track-id>      load a catalog track onto deck a or b
eject <deck>                unload the deck
play|pause|toggle <deck>    transport
cue <deck>                  jump to the cue-in point and pause
seek <deck> <secs>          move the playhead
sync <deck>                 toggle tempo sync to the other deck
tempo <deck> <pct>          tempo offset, -8 to 8
channel <deck> <gain> <high> <mid> <low> <volume>
gain|high|mid|low|volume <deck> <0-100>
xfader <0-100>              crossfader position
curve smooth|sharp|cut      crossfader curve
addcue|rmcue <deck> <secs>  cue markers
loop <deck> <start> <end>   set loop region
unloop <deck>               clear loop region
export <track-id> <formats> <template>
                            formats: mp3,wav,stems[,cues,grid,beatgrid]
status | tracks | help | quit";

/// Errors for text commands
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("missing {0}")]
    MissingArgument(&'static str),
    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),
    #[error("invalid deck {0:?} (expected a or b)")]
    InvalidDeck(String),
    #[error("invalid {name}: {value:?}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("unknown crossfader curve: {0}")]
    UnknownCurve(String),
    #[error("unknown export format: {0}")]
    UnknownFormat(String),
    #[error("no track {0} in the catalog")]
    UnknownTrack(TrackId),
}

/// Commands that can be dispatched from input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // Decks
    Load { deck: DeckId, track_id: TrackId },
    Eject(DeckId),
    Play(DeckId),
    Pause(DeckId),
    Toggle(DeckId),
    Cue(DeckId),
    Seek(DeckId, f64),
    Sync(DeckId),
    Tempo(DeckId, f64),
    AddCue(DeckId, f64),
    RemoveCue(DeckId, f64),
    Loop(DeckId, f64, f64),
    Unloop(DeckId),

    // Mixer
    Channel(DeckId, Channel),
    ChannelParam(DeckId, ChannelParam, f32),
    Crossfader(f32),
    Curve(CrossfaderCurve),

    Export { track_id: TrackId, options: ExportOptions },

    // Host
    Status,
    Tracks,
    Help,
    Quit,
}

/// What the host does with a command once catalog ids are resolved
#[derive(Debug, Clone)]
pub enum Dispatch {
    Engine(EngineCommand),
    Status,
    Tracks,
    Help,
    Quit,
}

impl Command {
    /// Resolve track ids against the catalog
    pub fn resolve(self, catalog: &TrackCatalog) -> Result<Dispatch, ParseError> {
        let lookup = |id: TrackId| {
            catalog
                .get(id.as_str())
                .ok_or(ParseError::UnknownTrack(id))
        };
        let cmd = match self {
            Command::Load { deck, track_id } => EngineCommand::LoadTrack(deck, lookup(track_id)?),
            Command::Eject(deck) => EngineCommand::Eject(deck),
            Command::Play(deck) => EngineCommand::Play(deck),
            Command::Pause(deck) => EngineCommand::Pause(deck),
            Command::Toggle(deck) => EngineCommand::Toggle(deck),
            Command::Cue(deck) => EngineCommand::Cue(deck),
            Command::Seek(deck, t) => EngineCommand::Seek(deck, t),
            Command::Sync(deck) => EngineCommand::Sync(deck),
            Command::Tempo(deck, pct) => EngineCommand::SetTempo(deck, pct),
            Command::AddCue(deck, t) => EngineCommand::AddCue(deck, t),
            Command::RemoveCue(deck, t) => EngineCommand::RemoveCue(deck, t),
            Command::Loop(deck, start, end) => EngineCommand::SetLoop(deck, start, end),
            Command::Unloop(deck) => EngineCommand::ClearLoop(deck),
            Command::Channel(deck, values) => EngineCommand::SetChannel(deck, values),
            Command::ChannelParam(deck, param, value) => {
                EngineCommand::SetChannelParam(deck, param, value)
            }
            Command::Crossfader(position) => EngineCommand::SetCrossfader(position),
            Command::Curve(curve) => EngineCommand::SetCrossfaderCurve(curve),
            Command::Export { track_id, options } => EngineCommand::Export {
                track: lookup(track_id)?,
                options,
            },
            Command::Status => return Ok(Dispatch::Status),
            Command::Tracks => return Ok(Dispatch::Tracks),
            Command::Help => return Ok(Dispatch::Help),
            Command::Quit => return Ok(Dispatch::Quit),
        };
        Ok(Dispatch::Engine(cmd))
    }
}

/// Parse one line of text into a command
pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    let mut args = line.split_whitespace();
    let name = args.next().ok_or(ParseError::Empty)?.to_lowercase();

    let cmd = match name.as_str() {
        "load" => Command::Load {
            deck: deck(&mut args)?,
            track_id: TrackId::new(word(&mut args, "track id")?),
        },
        "eject" => Command::Eject(deck(&mut args)?),
        "play" => Command::Play(deck(&mut args)?),
        "pause" => Command::Pause(deck(&mut args)?),
        "toggle" => Command::Toggle(deck(&mut args)?),
        "cue" => Command::Cue(deck(&mut args)?),
        "seek" => Command::Seek(deck(&mut args)?, number(&mut args, "position")?),
        "sync" => Command::Sync(deck(&mut args)?),
        "tempo" => Command::Tempo(deck(&mut args)?, number(&mut args, "tempo")?),
        "addcue" => Command::AddCue(deck(&mut args)?, number(&mut args, "cue time")?),
        "rmcue" => Command::RemoveCue(deck(&mut args)?, number(&mut args, "cue time")?),
        "loop" => Command::Loop(
            deck(&mut args)?,
            number(&mut args, "loop start")?,
            number(&mut args, "loop end")?,
        ),
        "unloop" => Command::Unloop(deck(&mut args)?),
        "channel" => {
            let deck = deck(&mut args)?;
            let mut next = |name: &'static str| control(&mut args, name);
            Command::Channel(
                deck,
                Channel {
                    gain: next("gain")?,
                    eq_high: next("eq high")?,
                    eq_mid: next("eq mid")?,
                    eq_low: next("eq low")?,
                    volume: next("volume")?,
                },
            )
        }
        "gain" | "high" | "mid" | "low" | "volume" => {
            let param = match name.as_str() {
                "gain" => ChannelParam::Gain,
                "high" => ChannelParam::EqHigh,
                "mid" => ChannelParam::EqMid,
                "low" => ChannelParam::EqLow,
                _ => ChannelParam::Volume,
            };
            let deck = deck(&mut args)?;
            Command::ChannelParam(deck, param, control(&mut args, param.name())?)
        }
        "xfader" => Command::Crossfader(control(&mut args, "crossfader position")?),
        "curve" => {
            let value = word(&mut args, "curve")?;
            Command::Curve(
                value
                    .parse()
                    .map_err(|_| ParseError::UnknownCurve(value.to_string()))?,
            )
        }
        "export" => {
            let track_id = TrackId::new(word(&mut args, "track id")?);
            let (formats, metadata) = export_flags(word(&mut args, "export formats")?)?;
            // The template is the rest of the line and may contain spaces
            let template = args.by_ref().collect::<Vec<_>>().join(" ");
            if template.is_empty() {
                return Err(ParseError::MissingArgument("file naming template"));
            }
            return Ok(Command::Export {
                track_id,
                options: ExportOptions {
                    formats,
                    metadata,
                    file_naming_template: template,
                },
            });
        }
        "status" => Command::Status,
        "tracks" => Command::Tracks,
        "help" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        _ => return Err(ParseError::UnknownCommand(name)),
    };

    match args.next() {
        Some(extra) => Err(ParseError::UnexpectedArgument(extra.to_string())),
        None => Ok(cmd),
    }
}

fn word<'a>(args: &mut SplitWhitespace<'a>, name: &'static str) -> Result<&'a str, ParseError> {
    args.next().ok_or(ParseError::MissingArgument(name))
}

fn deck(args: &mut SplitWhitespace<'_>) -> Result<DeckId, ParseError> {
    let value = word(args, "deck")?;
    match value.to_lowercase().as_str() {
        "a" => Ok(DeckId::A),
        "b" => Ok(DeckId::B),
        _ => Err(ParseError::InvalidDeck(value.to_string())),
    }
}

fn number(args: &mut SplitWhitespace<'_>, name: &'static str) -> Result<f64, ParseError> {
    let value = word(args, name)?;
    value.parse().map_err(|_| ParseError::InvalidNumber {
        name,
        value: value.to_string(),
    })
}

/// A 0-100 control value, clamped before narrowing so huge finite input
/// does not become infinite
fn control(args: &mut SplitWhitespace<'_>, name: &'static str) -> Result<f32, ParseError> {
    let value = number(args, name)?;
    if value.is_finite() {
        Ok(value.clamp(0.0, f64::from(CONTROL_MAX)) as f32)
    } else {
        Ok(value as f32)
    }
}

fn export_flags(list: &str) -> Result<(ExportFormats, ExportMetadata), ParseError> {
    let mut formats = ExportFormats::default();
    let mut metadata = ExportMetadata::default();
    for flag in list.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        match flag.to_lowercase().as_str() {
            "mp3" => formats.mp3 = true,
            "wav" => formats.wav = true,
            "stems" => formats.stems = true,
            "cues" => metadata.rekordbox_cues = true,
            "grid" => metadata.bpm_key_grid = true,
            "beatgrid" => metadata.beat_grid = true,
            _ => return Err(ParseError::UnknownFormat(flag.to_string())),
        }
    }
    Ok((formats, metadata))
}
