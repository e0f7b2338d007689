#[derive(Debug, thiserror::Error)]
pub enum CoverError {
    #[error("nothing is currently playing, cannot resolve descriptor")]
    NothingPlaying,

    #[error("no cover art is available for this track")]
    NoCoverAvailable,

    #[error("io error writing cover file: {0}")]
    Io(#[from] std::io::Error),

    #[error("image decode/encode error: {0}")]
    Image(#[from] image::ImageError),
}

impl CoverError {
    /// Wire fault code, per the operation error taxonomy.
    pub fn code(&self) -> i32 {
        match self {
            CoverError::NothingPlaying => 21,
            CoverError::NoCoverAvailable => 22,
            CoverError::Io(_) | CoverError::Image(_) => 7,
        }
    }
}

impl From<aimpctl_value::NothingPlayingError> for CoverError {
    fn from(_: aimpctl_value::NothingPlayingError) -> Self {
        CoverError::NothingPlaying
    }
}

pub type Result<T> = std::result::Result<T, CoverError>;
