//! Per-identity track state.
//!
//! The store is an arena keyed by [`TrackId`]. Each entry remembers the
//! class seen at first sighting, the last side of the line that was not
//! exactly on it, and when the track was last observed. Entries are
//! dropped by an explicit sweep ([`TrackStore::evict_stale`]) or when the
//! tracker closes the identity; nothing is cleaned up implicitly.

use std::collections::HashMap;

use tracing::debug;

use super::geometry::{is_neutral, Point};
use super::label::{ClassLabel, TrackId};

/// What the store knows about one active track.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackState {
    /// Class fixed at first sighting.
    pub class: ClassLabel,
    /// Most recent side value that was strictly off the line, or `0.0` if
    /// the track has only ever been seen exactly on it.
    pub side: f64,
    /// Frame index of the most recent observation.
    pub last_seen: u64,
    /// Position at the most recent observation.
    pub last_position: Point,
}

/// Result of [`TrackStore::upsert`].
#[derive(Clone, Debug, PartialEq)]
pub enum Upsert {
    /// First sighting. There is no prior side to compare against.
    New,
    /// The track was already known; carries the state from before this
    /// update.
    Known {
        prior_side: f64,
        prior_position: Point,
        class: ClassLabel,
    },
}

/// Owns the state of every active track.
#[derive(Clone, Debug, Default)]
pub struct TrackStore {
    tracks: HashMap<TrackId, TrackState>,
}

impl TrackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an observation and returns what was known before it.
    ///
    /// A new identity is created with the given class and side. A known
    /// identity keeps its original class; its side is replaced only when
    /// the new side value is strictly off the line.
    pub fn upsert(
        &mut self,
        id: TrackId,
        class: &ClassLabel,
        side: f64,
        position: Point,
        frame: u64,
    ) -> Upsert {
        match self.tracks.get_mut(&id) {
            Some(state) => {
                let previous = Upsert::Known {
                    prior_side: state.side,
                    prior_position: state.last_position,
                    class: state.class.clone(),
                };
                if !is_neutral(side) {
                    state.side = side;
                }
                state.last_seen = frame;
                state.last_position = position;
                previous
            }
            None => {
                self.tracks.insert(
                    id,
                    TrackState {
                        class: class.clone(),
                        side: if is_neutral(side) { 0.0 } else { side },
                        last_seen: frame,
                        last_position: position,
                    },
                );
                Upsert::New
            }
        }
    }

    /// Drops every track not seen for more than `timeout_frames` frames.
    ///
    /// Returns the number of tracks removed. Eviction never produces
    /// events.
    pub fn evict_stale(&mut self, current_frame: u64, timeout_frames: u64) -> usize {
        let before = self.tracks.len();
        self.tracks.retain(|id, state| {
            let keep = current_frame.saturating_sub(state.last_seen) <= timeout_frames;
            if !keep {
                debug!(track = %id, last_seen = state.last_seen, "evicting stale track");
            }
            keep
        });
        before - self.tracks.len()
    }

    /// Removes a track the external tracker has closed.
    pub fn remove(&mut self, id: TrackId) -> Option<TrackState> {
        self.tracks.remove(&id)
    }

    pub fn get(&self, id: TrackId) -> Option<&TrackState> {
        self.tracks.get(&id)
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.tracks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}
