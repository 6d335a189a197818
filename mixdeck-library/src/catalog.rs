//! In-memory track catalog
//!
//! Owns the immutable track records; decks receive shared references.

use crate::track::{Track, TrackId};
use std::sync::Arc;

/// Collection of tracks in insertion order
#[derive(Debug, Default, Clone)]
pub struct TrackCatalog {
    tracks: Vec<Arc<Track>>,
}

impl TrackCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a track, replacing any existing record with the same id
    pub fn insert(&mut self, track: Track) -> Arc<Track> {
        let track = Arc::new(track);
        match self.tracks.iter_mut().find(|t| t.id == track.id) {
            Some(existing) => *existing = track.clone(),
            None => self.tracks.push(track.clone()),
        }
        track
    }

    /// Look up a track by id
    pub fn get(&self, id: &str) -> Option<Arc<Track>> {
        self.tracks.iter().find(|t| t.id.as_str() == id).cloned()
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.tracks.iter().any(|t| &t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Track>> {
        self.tracks.iter()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl FromIterator<Track> for TrackCatalog {
    fn from_iter<I: IntoIterator<Item = Track>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for track in iter {
            catalog.insert(track);
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut catalog = TrackCatalog::new();
        catalog.insert(Track::new("a", "A", "X", 120.0, "1A", 100.0));
        catalog.insert(Track::new("b", "B", "Y", 125.0, "2A", 200.0));

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("b").unwrap().title, "B");
        assert!(catalog.get("c").is_none());
    }

    #[test]
    fn test_insert_replaces_same_id() {
        let mut catalog = TrackCatalog::new();
        catalog.insert(Track::new("a", "Old", "X", 120.0, "1A", 100.0));
        catalog.insert(Track::new("a", "New", "X", 120.0, "1A", 100.0));

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("a").unwrap().title, "New");
        assert!(catalog.contains(&TrackId::new("a")));
    }

    #[test]
    fn test_shared_reference() {
        let mut catalog = TrackCatalog::new();
        let inserted = catalog.insert(Track::new("a", "A", "X", 120.0, "1A", 100.0));
        let fetched = catalog.get("a").unwrap();
        assert!(Arc::ptr_eq(&inserted, &fetched));
    }
}
