//! Engine error kinds

use crate::deck::DeckId;
use crate::drag::DragId;
use mixdeck_library::{ExportError, TrackError};
use thiserror::Error;

/// Errors produced by engine commands
///
/// Only track, loop and export errors reach callers. Out-of-range control
/// values and invalidated drags are recovered inside the engine and only
/// show up in the log.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid track: {0}")]
    InvalidTrack(#[from] TrackError),
    #[error("no track loaded on deck {0}")]
    NoTrackLoaded(DeckId),
    #[error("invalid loop region [{start}, {end}) on deck {deck} (track is {duration}s)")]
    InvalidLoopRegion {
        deck: DeckId,
        start: f64,
        end: f64,
        duration: f64,
    },
    #[error("{control} value {value} outside [{min}, {max}]")]
    OutOfRangeValue {
        control: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("drag session {0} is no longer active")]
    DragSessionInvalidated(DragId),
    #[error("export rejected: {0}")]
    Export(#[from] ExportError),
    #[error("no export renderer attached")]
    ExportUnavailable,
}

/// Bring a control value into `[min, max]`
///
/// Non-finite values are dropped (None) so the previous value stays in
/// place; finite values outside the range are clamped. Both cases are
/// logged at debug level.
pub(crate) fn recover_range(control: &'static str, value: f64, min: f64, max: f64) -> Option<f64> {
    if !value.is_finite() {
        tracing::debug!(control, value, "ignoring non-finite control value");
        return None;
    }
    if value < min || value > max {
        let error = EngineError::OutOfRangeValue {
            control,
            value,
            min,
            max,
        };
        tracing::debug!(%error, "clamping control value");
        return Some(value.clamp(min, max));
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recover_range() {
        assert_eq!(recover_range("x", 5.0, 0.0, 10.0), Some(5.0));
        assert_eq!(recover_range("x", -5.0, 0.0, 10.0), Some(0.0));
        assert_eq!(recover_range("x", 50.0, 0.0, 10.0), Some(10.0));
        assert_eq!(recover_range("x", f64::NAN, 0.0, 10.0), None);
        assert_eq!(recover_range("x", f64::INFINITY, 0.0, 10.0), None);
    }

    #[test]
    fn test_messages() {
        let err = EngineError::NoTrackLoaded(DeckId::B);
        assert_eq!(err.to_string(), "no track loaded on deck B");
    }
}
