//! The fault taxonomy shared by every frontend: envelope errors, typed-value
//! errors delegated from `aimpctl_value`, and the domain-specific operation
//! codes 11-29.

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("request could not be parsed")]
    RequestParsing,
    #[error("method not found: {0}")]
    MethodNotFound(String),
    #[error(transparent)]
    Value(#[from] aimpctl_value::ValueError),
    #[error("internal error: {0}")]
    Internal(String),

    #[error("wrong argument: {0}")]
    WrongArgument(String),
    #[error("playback failed")]
    PlaybackFailed,
    #[error("shuffle toggle failed")]
    ShuffleFailed,
    #[error("repeat toggle failed")]
    RepeatFailed,
    #[error("volume out of range")]
    VolumeOutOfRange,
    #[error("volume could not be set")]
    VolumeSetFailed,
    #[error("mute toggle failed")]
    MuteFailed,
    #[error("enqueue failed")]
    EnqueueFailed,
    #[error("dequeue failed")]
    DequeueFailed,
    #[error("playlist not found")]
    PlaylistNotFound,
    #[error("track not found")]
    TrackNotFound,
    #[error("album cover could not be loaded")]
    AlbumCoverLoadFailed,
    #[error("rating could not be set")]
    RatingSetFailed,
    #[error("status could not be set")]
    StatusSetFailed,
    #[error("radio capture mode toggle failed")]
    RadioCaptureFailed,
    #[error("queue move failed")]
    MoveInQueueFailed,
    #[error("add url failed")]
    AddUrlFailed,
    #[error("remove track failed")]
    RemoveTrackFailed,
    #[error("physical track removal is disabled")]
    RemoveTrackDisabled,
    #[error("scheduler is disabled")]
    SchedulerDisabled,
}

impl RpcError {
    pub fn code(&self) -> i32 {
        match self {
            RpcError::RequestParsing => 1,
            RpcError::MethodNotFound(_) => 2,
            RpcError::Value(e) => e.code(),
            RpcError::Internal(_) => 7,
            RpcError::WrongArgument(_) => 11,
            RpcError::PlaybackFailed => 12,
            RpcError::ShuffleFailed => 13,
            RpcError::RepeatFailed => 14,
            RpcError::VolumeOutOfRange => 15,
            RpcError::VolumeSetFailed => 16,
            RpcError::MuteFailed => 17,
            RpcError::EnqueueFailed => 18,
            RpcError::DequeueFailed => 19,
            RpcError::PlaylistNotFound => 20,
            RpcError::TrackNotFound => 21,
            RpcError::AlbumCoverLoadFailed => 22,
            RpcError::RatingSetFailed => 23,
            RpcError::StatusSetFailed => 24,
            RpcError::RadioCaptureFailed => 25,
            RpcError::MoveInQueueFailed => 26,
            RpcError::AddUrlFailed => 27,
            RpcError::RemoveTrackFailed => 28,
            RpcError::RemoveTrackDisabled => 29,
            RpcError::SchedulerDisabled => 30,
        }
    }
}

impl From<aimpctl_store::Error> for RpcError {
    fn from(e: aimpctl_store::Error) -> Self {
        match e {
            aimpctl_store::Error::PlaylistNotFound(_) => RpcError::PlaylistNotFound,
            aimpctl_store::Error::TrackNotFound { .. } => RpcError::TrackNotFound,
            aimpctl_store::Error::NothingPlaying => RpcError::TrackNotFound,
            aimpctl_store::Error::Persistence(e) => RpcError::Internal(e.to_string()),
            aimpctl_store::Error::Value(e) => RpcError::Value(e),
        }
    }
}

impl From<aimpctl_covers::CoverError> for RpcError {
    fn from(e: aimpctl_covers::CoverError) -> Self {
        match e {
            aimpctl_covers::CoverError::NothingPlaying => RpcError::TrackNotFound,
            aimpctl_covers::CoverError::NoCoverAvailable => RpcError::AlbumCoverLoadFailed,
            aimpctl_covers::CoverError::Io(e) => RpcError::Internal(e.to_string()),
            aimpctl_covers::CoverError::Image(e) => RpcError::Internal(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
