//! Store-level errors, carrying the wire fault codes they translate to.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("playlist not found: {0}")]
    PlaylistNotFound(i32),

    #[error("track not found: playlist {playlist_id} track {track_id}")]
    TrackNotFound { playlist_id: i32, track_id: i32 },

    #[error("nothing is currently playing, cannot resolve descriptor")]
    NothingPlaying,

    #[error("persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error(transparent)]
    Value(#[from] aimpctl_value::ValueError),
}

impl Error {
    /// Wire fault code for this error, per the error taxonomy in §6/§7.
    pub fn code(&self) -> i32 {
        match self {
            Error::PlaylistNotFound(_) => 20,
            Error::TrackNotFound { .. } => 21,
            Error::NothingPlaying => 21,
            Error::Persistence(_) => 7,
            Error::Value(e) => e.code(),
        }
    }
}

impl From<aimpctl_value::NothingPlayingError> for Error {
    fn from(_: aimpctl_value::NothingPlayingError) -> Self {
        Error::NothingPlaying
    }
}

pub type Result<T> = std::result::Result<T, Error>;
