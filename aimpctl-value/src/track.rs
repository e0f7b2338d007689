//! Track descriptors: `(playlist_id, track_id)` pairs with the `-1`
//! "currently playing" sentinel rules from the data model.

use std::fmt;

/// `-1` means "the currently playing playlist" (for `playlist_id`) or "the
/// currently playing track" (for `track_id`).
pub const CURRENT_SENTINEL: i32 = -1;

/// A `(playlist_id, track_id)` pair, possibly still carrying `-1` sentinels.
/// Ordering is lexicographic, matching the data model's invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackDescription {
    pub playlist_id: i32,
    pub track_id: i32,
}

impl TrackDescription {
    pub fn new(playlist_id: i32, track_id: i32) -> Self {
        Self {
            playlist_id,
            track_id,
        }
    }

    pub fn is_absolute(&self) -> bool {
        self.playlist_id != CURRENT_SENTINEL && self.track_id != CURRENT_SENTINEL
    }

    /// Resolves `-1` sentinels against whatever is currently playing.
    /// Fails if a sentinel is present but nothing is playing.
    pub fn resolve(&self, now_playing: Option<TrackDescription>) -> Result<TrackDescription, NothingPlayingError> {
        if self.is_absolute() {
            return Ok(*self);
        }
        let current = now_playing.ok_or(NothingPlayingError)?;
        Ok(TrackDescription {
            playlist_id: if self.playlist_id == CURRENT_SENTINEL {
                current.playlist_id
            } else {
                self.playlist_id
            },
            track_id: if self.track_id == CURRENT_SENTINEL {
                current.track_id
            } else {
                self.track_id
            },
        })
    }
}

impl fmt::Display for TrackDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.playlist_id, self.track_id)
    }
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("track descriptor uses the current-playback sentinel but nothing is playing")]
pub struct NothingPlayingError;
