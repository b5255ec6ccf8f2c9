//! No-repeat track selection.

use std::collections::HashSet;

use rand::Rng;

use crate::catalog::{Track, TrackId};

/// Tracks that can still be played this session.
///
/// The pool only shrinks. Once an id has been removed it is remembered, so a
/// later [`TrackPool::insert`] of the same id is refused.
#[derive(Debug, Clone, Default)]
pub struct TrackPool {
    available: Vec<Track>,
    /// Ids of `available`, kept in step with it.
    ids: HashSet<TrackId>,
    played: HashSet<TrackId>,
}

impl TrackPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool, keeping the first occurrence of each id.
    pub fn from_tracks(tracks: impl IntoIterator<Item = Track>) -> Self {
        let mut pool = Self::new();
        for track in tracks {
            pool.insert(track);
        }
        pool
    }

    /// Add a track unless its id is already available or was played.
    pub fn insert(&mut self, track: Track) -> bool {
        if self.played.contains(&track.id) || !self.ids.insert(track.id.clone()) {
            return false;
        }
        self.available.push(track);
        true
    }

    pub fn len(&self) -> usize {
        self.available.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }

    pub fn played_count(&self) -> usize {
        self.played.len()
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.ids.contains(id)
    }

    pub fn was_played(&self, id: &TrackId) -> bool {
        self.played.contains(id)
    }

    /// Uniformly pick one available track without removing it.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Track> {
        if self.available.is_empty() {
            return None;
        }
        let index = rng.random_range(0..self.available.len());
        self.available.get(index)
    }

    /// Permanently exclude `id`. Returns `false` when it was not available,
    /// including when it had already been removed.
    pub fn remove(&mut self, id: &TrackId) -> bool {
        if !self.ids.remove(id) {
            return false;
        }
        let Some(position) = self.available.iter().position(|track| &track.id == id) else {
            return false;
        };
        let track = self.available.swap_remove(position);
        self.played.insert(track.id);
        true
    }

    /// Pick and remove in one step.
    pub fn take<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Track> {
        if self.available.is_empty() {
            return None;
        }
        let index = rng.random_range(0..self.available.len());
        let track = self.available.swap_remove(index);
        self.ids.remove(&track.id);
        self.played.insert(track.id.clone());
        Some(track)
    }
}
