//! Export request validation and forwarding
//!
//! Mixdeck never encodes audio. An export request is checked here and then
//! handed, unchanged, to whatever rendering collaborator sits behind an
//! [`ExportSink`].

use crate::track::{Track, TrackError};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::Arc;
use thiserror::Error;

/// Placeholders accepted in a file naming template
pub const TEMPLATE_PLACEHOLDERS: [&str; 5] = ["id", "title", "artist", "bpm", "key"];

/// Errors for export requests
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExportError {
    #[error("no export format selected")]
    NoFormatSelected,
    #[error("file naming template is empty")]
    EmptyTemplate,
    #[error("unknown placeholder {{{0}}} in file naming template")]
    UnknownPlaceholder(String),
    #[error("unterminated placeholder in file naming template")]
    UnterminatedPlaceholder,
    #[error("file naming template contains path separator {0:?}")]
    PathSeparator(char),
    #[error(transparent)]
    InvalidTrack(#[from] TrackError),
    #[error("export queue is full")]
    QueueFull,
    #[error("export renderer is gone")]
    SinkClosed,
}

/// Output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportFormats {
    pub mp3: bool,
    pub wav: bool,
    pub stems: bool,
}

impl ExportFormats {
    pub fn any(&self) -> bool {
        self.mp3 || self.wav || self.stems
    }
}

/// Metadata to embed alongside the audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportMetadata {
    pub rekordbox_cues: bool,
    pub bpm_key_grid: bool,
    pub beat_grid: bool,
}

/// Export options as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub formats: ExportFormats,
    pub metadata: ExportMetadata,
    /// e.g. `{artist} - {title} ({bpm})`
    pub file_naming_template: String,
}

impl ExportOptions {
    /// Check the options against a track
    pub fn validate(&self, track: &Track) -> Result<(), ExportError> {
        track.timing()?;
        if !self.formats.any() {
            return Err(ExportError::NoFormatSelected);
        }
        if self.file_naming_template.trim().is_empty() {
            return Err(ExportError::EmptyTemplate);
        }
        parse_template(&self.file_naming_template).map(|_| ())
    }

    /// File name the template produces for a track (without extension)
    pub fn file_name_for(&self, track: &Track) -> Result<String, ExportError> {
        let segments = parse_template(&self.file_naming_template)?;
        let mut name = String::new();
        for segment in segments {
            match segment {
                Segment::Literal(text) => name.push_str(text),
                Segment::Placeholder("id") => name.push_str(track.id.as_str()),
                Segment::Placeholder("title") => name.push_str(&track.title),
                Segment::Placeholder("artist") => name.push_str(&track.artist),
                Segment::Placeholder("bpm") => {
                    if let Some(bpm) = track.bpm {
                        name.push_str(&format!("{:.0}", bpm));
                    }
                }
                Segment::Placeholder("key") => name.push_str(&track.key),
                Segment::Placeholder(other) => {
                    return Err(ExportError::UnknownPlaceholder(other.to_string()))
                }
            }
        }
        Ok(name)
    }
}

enum Segment<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

fn parse_template(template: &str) -> Result<Vec<Segment<'_>>, ExportError> {
    let mut segments = Vec::new();
    let mut rest = template;

    while !rest.is_empty() {
        match rest.find('{') {
            Some(open) => {
                if open > 0 {
                    segments.push(Segment::Literal(check_literal(&rest[..open])?));
                }
                let after = &rest[open + 1..];
                let close = after.find('}').ok_or(ExportError::UnterminatedPlaceholder)?;
                let name = &after[..close];
                if name.contains('{') {
                    return Err(ExportError::UnterminatedPlaceholder);
                }
                if !TEMPLATE_PLACEHOLDERS.contains(&name) {
                    return Err(ExportError::UnknownPlaceholder(name.to_string()));
                }
                segments.push(Segment::Placeholder(name));
                rest = &after[close + 1..];
            }
            None => {
                segments.push(Segment::Literal(check_literal(rest)?));
                rest = "";
            }
        }
    }

    Ok(segments)
}

fn check_literal(text: &str) -> Result<&str, ExportError> {
    match text.chars().find(|c| matches!(c, '/' | '\\')) {
        Some(sep) => Err(ExportError::PathSeparator(sep)),
        None => Ok(text),
    }
}

/// A validated export request
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub track: Arc<Track>,
    pub options: ExportOptions,
}

/// Rendering collaborator that receives validated export requests
pub trait ExportSink: Send {
    fn submit(&self, request: ExportRequest) -> Result<(), ExportError>;
}

/// Export sink that forwards requests over a bounded channel
pub struct ChannelExportSink {
    tx: Sender<ExportRequest>,
}

impl ChannelExportSink {
    /// Create a sink and the receiving end for the renderer
    pub fn new(capacity: usize) -> (Self, Receiver<ExportRequest>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Self { tx }, rx)
    }
}

impl ExportSink for ChannelExportSink {
    fn submit(&self, request: ExportRequest) -> Result<(), ExportError> {
        self.tx.try_send(request).map_err(|e| match e {
            TrySendError::Full(_) => ExportError::QueueFull,
            TrySendError::Disconnected(_) => ExportError::SinkClosed,
        })
    }
}

/// Validate and forward an export request
pub fn forward_export(
    sink: &dyn ExportSink,
    track: Arc<Track>,
    options: ExportOptions,
) -> Result<(), ExportError> {
    options.validate(&track)?;
    tracing::info!(track = %track.id, template = %options.file_naming_template, "forwarding export");
    sink.submit(ExportRequest { track, options })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> Arc<Track> {
        Arc::new(Track::new("t1", "Parallax", "Deep Field", 126.0, "9A", 300.0))
    }

    fn options(template: &str) -> ExportOptions {
        ExportOptions {
            formats: ExportFormats {
                mp3: true,
                ..Default::default()
            },
            metadata: ExportMetadata {
                beat_grid: true,
                ..Default::default()
            },
            file_naming_template: template.to_string(),
        }
    }

    #[test]
    fn test_valid_options() {
        assert!(options("{artist} - {title} [{bpm}]").validate(&track()).is_ok());
    }

    #[test]
    fn test_no_format_rejected() {
        let mut opts = options("{title}");
        opts.formats = ExportFormats::default();
        assert_eq!(opts.validate(&track()), Err(ExportError::NoFormatSelected));
    }

    #[test]
    fn test_template_errors() {
        let t = track();
        assert_eq!(options("  ").validate(&t), Err(ExportError::EmptyTemplate));
        assert_eq!(
            options("{album}").validate(&t),
            Err(ExportError::UnknownPlaceholder("album".into()))
        );
        assert_eq!(
            options("{title").validate(&t),
            Err(ExportError::UnterminatedPlaceholder)
        );
        assert_eq!(
            options("out/{title}").validate(&t),
            Err(ExportError::PathSeparator('/'))
        );
    }

    #[test]
    fn test_invalid_track_rejected() {
        let mut bad = Track::new("t2", "X", "Y", 120.0, "1A", 10.0);
        bad.duration_secs = None;
        assert!(matches!(
            options("{title}").validate(&bad),
            Err(ExportError::InvalidTrack(_))
        ));
    }

    #[test]
    fn test_file_name() {
        let name = options("{artist} - {title} ({bpm} {key})")
            .file_name_for(&track())
            .unwrap();
        assert_eq!(name, "Deep Field - Parallax (126 9A)");
    }

    #[test]
    fn test_forward_unchanged() {
        let (sink, rx) = ChannelExportSink::new(4);
        let opts = options("{id}");
        forward_export(&sink, track(), opts.clone()).unwrap();

        let request = rx.try_recv().unwrap();
        assert_eq!(request.options, opts);
        assert_eq!(request.track.id.as_str(), "t1");
    }

    #[test]
    fn test_invalid_request_not_forwarded() {
        let (sink, rx) = ChannelExportSink::new(4);
        let mut opts = options("{id}");
        opts.formats = ExportFormats::default();
        assert!(forward_export(&sink, track(), opts).is_err());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_sink() {
        let (sink, rx) = ChannelExportSink::new(1);
        drop(rx);
        assert_eq!(
            forward_export(&sink, track(), options("{id}")),
            Err(ExportError::SinkClosed)
        );
    }
}
