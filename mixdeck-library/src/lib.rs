//! Track catalog for Mixdeck - track records, synthetic waveforms, export and config

mod catalog;
mod config;
mod export;
mod synthetic;
mod track;

pub use catalog::TrackCatalog;
pub use config::{Config, MAX_TICK_RATE_HZ, MIN_TICK_RATE_HZ};
pub use export::{
    forward_export, ChannelExportSink, ExportError, ExportFormats, ExportMetadata, ExportOptions,
    ExportRequest, ExportSink, TEMPLATE_PLACEHOLDERS,
};
pub use synthetic::{demo_tracks, SyntheticAmplitudes, DEFAULT_POINTS_PER_SECOND};
pub use track::{Track, TrackError, TrackId, TrackTiming};
