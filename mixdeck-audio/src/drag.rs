//! Pointer drag sessions for knobs, faders and the crossfader
//!
//! A session captures the control's value and the pointer position on press.
//! Every move maps the pointer travel since the press onto the control's
//! range; release ends the session. Sessions are keyed by id, not by widget
//! bounds, so a pointer that leaves the control keeps driving it until
//! release.

use crate::deck::{DeckId, MAX_TEMPO_OFFSET};
use crate::error::EngineError;
use crate::mixer::{ChannelParam, CONTROL_MAX};
use std::fmt;

/// Default pointer travel for a full-range sweep
pub const DEFAULT_DRAG_PIXELS: f32 = 200.0;

/// Drag session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DragId(u64);

impl fmt::Display for DragId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Control a drag session drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragTarget {
    Channel(DeckId, ChannelParam),
    Tempo(DeckId),
    Crossfader,
}

impl DragTarget {
    /// Deck the control belongs to, if any
    pub fn deck(&self) -> Option<DeckId> {
        match self {
            Self::Channel(deck, _) | Self::Tempo(deck) => Some(*deck),
            Self::Crossfader => None,
        }
    }

    pub fn axis(&self) -> DragAxis {
        match self {
            Self::Crossfader => DragAxis::Horizontal,
            Self::Channel(..) | Self::Tempo(_) => DragAxis::Vertical,
        }
    }

    /// Value range `(min, max)` of the control
    pub fn range(&self) -> (f64, f64) {
        match self {
            Self::Tempo(_) => (-MAX_TEMPO_OFFSET, MAX_TEMPO_OFFSET),
            Self::Channel(..) | Self::Crossfader => (0.0, CONTROL_MAX as f64),
        }
    }
}

/// Pointer axis a control follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragAxis {
    /// Up increases (screen y grows downward)
    Vertical,
    /// Right increases
    Horizontal,
}

/// Pointer position in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerPos {
    pub x: f32,
    pub y: f32,
}

impl PointerPos {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An in-flight drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub id: DragId,
    pub target: DragTarget,
    pub start_value: f64,
    pub origin: PointerPos,
}

impl DragSession {
    /// Control value for a pointer position
    pub fn value_at(&self, pointer: PointerPos, drag_pixels: f32) -> f64 {
        let travel = f64::from(match self.target.axis() {
            DragAxis::Vertical => self.origin.y - pointer.y,
            DragAxis::Horizontal => pointer.x - self.origin.x,
        });
        let (min, max) = self.target.range();
        let value = self.start_value + travel / drag_pixels as f64 * (max - min);
        if value.is_finite() {
            value.clamp(min, max)
        } else {
            self.start_value
        }
    }
}

/// Registry of active drag sessions
#[derive(Debug, Clone)]
pub struct DragSessions {
    sessions: Vec<DragSession>,
    next_id: u64,
    drag_pixels: f32,
}

impl Default for DragSessions {
    fn default() -> Self {
        Self::new(DEFAULT_DRAG_PIXELS)
    }
}

impl DragSessions {
    pub fn new(drag_pixels: f32) -> Self {
        let drag_pixels = if drag_pixels.is_finite() && drag_pixels > 0.0 {
            drag_pixels
        } else {
            DEFAULT_DRAG_PIXELS
        };
        Self {
            sessions: Vec::new(),
            next_id: 1,
            drag_pixels,
        }
    }

    pub fn drag_pixels(&self) -> f32 {
        self.drag_pixels
    }

    /// Start a session, replacing any session on the same target
    pub fn begin(&mut self, target: DragTarget, start_value: f64, origin: PointerPos) -> DragId {
        self.sessions.retain(|s| s.target != target);
        let id = DragId(self.next_id);
        self.next_id += 1;
        self.sessions.push(DragSession {
            id,
            target,
            start_value,
            origin,
        });
        id
    }

    pub fn get(&self, id: DragId) -> Option<&DragSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn is_active(&self, id: DragId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Target and new value for a pointer move
    pub fn value_for(
        &self,
        id: DragId,
        pointer: PointerPos,
    ) -> Result<(DragTarget, f64), EngineError> {
        let session = self.get(id).ok_or(EngineError::DragSessionInvalidated(id))?;
        Ok((session.target, session.value_at(pointer, self.drag_pixels)))
    }

    /// End a session; returns false if it was already gone
    pub fn end(&mut self, id: DragId) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != id);
        self.sessions.len() != before
    }

    /// Drop every session driving a control of `deck`
    pub fn invalidate_deck(&mut self, deck: DeckId) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|s| {
            let stale = s.target.deck() == Some(deck);
            if stale {
                tracing::debug!(drag = %s.id, %deck, "drag session invalidated");
            }
            !stale
        });
        before - self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertical_drag_up_increases() {
        let mut drags = DragSessions::new(200.0);
        let target = DragTarget::Channel(DeckId::A, ChannelParam::Volume);
        let id = drags.begin(target, 50.0, PointerPos::new(10.0, 300.0));

        let (t, value) = drags.value_for(id, PointerPos::new(400.0, 250.0)).unwrap();
        assert_eq!(t, target);
        assert!((value - 75.0).abs() < 1e-9);

        let (_, value) = drags.value_for(id, PointerPos::new(10.0, 900.0)).unwrap();
        assert_eq!(value, 0.0);
    }

    #[test]
    fn test_crossfader_is_horizontal() {
        let mut drags = DragSessions::new(200.0);
        let id = drags.begin(DragTarget::Crossfader, 50.0, PointerPos::new(100.0, 100.0));
        let (_, value) = drags.value_for(id, PointerPos::new(60.0, 0.0)).unwrap();
        assert!((value - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_tempo_range() {
        let mut drags = DragSessions::new(100.0);
        let id = drags.begin(DragTarget::Tempo(DeckId::B), 0.0, PointerPos::default());
        let (_, value) = drags.value_for(id, PointerPos::new(0.0, -25.0)).unwrap();
        assert!((value - 4.0).abs() < 1e-9);
        let (_, value) = drags.value_for(id, PointerPos::new(0.0, -1000.0)).unwrap();
        assert_eq!(value, MAX_TEMPO_OFFSET);
    }

    #[test]
    fn test_new_session_replaces_same_target() {
        let mut drags = DragSessions::default();
        let first = drags.begin(DragTarget::Crossfader, 50.0, PointerPos::default());
        let second = drags.begin(DragTarget::Crossfader, 20.0, PointerPos::default());
        assert!(!drags.is_active(first));
        assert!(drags.is_active(second));
        assert_eq!(drags.len(), 1);
    }

    #[test]
    fn test_invalidate_deck() {
        let mut drags = DragSessions::default();
        let a = drags.begin(
            DragTarget::Channel(DeckId::A, ChannelParam::Gain),
            100.0,
            PointerPos::default(),
        );
        let tempo_a = drags.begin(DragTarget::Tempo(DeckId::A), 0.0, PointerPos::default());
        let b = drags.begin(DragTarget::Tempo(DeckId::B), 0.0, PointerPos::default());
        let xf = drags.begin(DragTarget::Crossfader, 50.0, PointerPos::default());

        assert_eq!(drags.invalidate_deck(DeckId::A), 2);
        assert_eq!(
            drags.value_for(a, PointerPos::default()),
            Err(EngineError::DragSessionInvalidated(a))
        );
        assert!(!drags.is_active(tempo_a));
        assert!(drags.is_active(b));
        assert!(drags.is_active(xf));
    }

    #[test]
    fn test_end() {
        let mut drags = DragSessions::default();
        let id = drags.begin(DragTarget::Crossfader, 50.0, PointerPos::default());
        assert!(drags.end(id));
        assert!(!drags.end(id));
        assert!(drags.is_empty());
    }

    #[test]
    fn test_invalid_pixels_recovered() {
        assert_eq!(DragSessions::new(0.0).drag_pixels(), DEFAULT_DRAG_PIXELS);
        assert_eq!(DragSessions::new(f32::NAN).drag_pixels(), DEFAULT_DRAG_PIXELS);
    }
}
