//! `GetAlbumCoverURI`: the only control-family method that reaches into the
//! cover-art component rather than the store or the player backend
//! directly.

use std::sync::Arc;

use aimpctl_covers::{CoverService, CoverSource};
use aimpctl_value::{TrackDescription, Value};
use async_trait::async_trait;

use crate::error::{Result, RpcError};
use crate::registry::{DelayedSender, Method, Outcome};

pub struct GetAlbumCoverUri<S: CoverSource> {
    service: Arc<CoverService<S>>,
}

impl<S: CoverSource> GetAlbumCoverUri<S> {
    pub fn new(service: Arc<CoverService<S>>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S: CoverSource + 'static> Method for GetAlbumCoverUri<S> {
    async fn invoke(&self, params: Value, _delayed: DelayedSender) -> Result<Outcome> {
        let playlist_id = params.member("playlist_id")?.as_int()?;
        let track_id = params.member("track_id")?.as_int()?;
        let width = params.member_opt("cover_width")?.map(Value::as_int).transpose()?.unwrap_or(0);
        let height = params.member_opt("cover_height")?.map(Value::as_int).transpose()?.unwrap_or(0);
        if width < 0 || height < 0 {
            return Err(RpcError::WrongArgument("cover dimensions must be non-negative".into()));
        }

        let track = TrackDescription::new(playlist_id, track_id);
        let uri = self
            .service
            .resolve(track, width as u32, height as u32)
            .await
            .map_err(RpcError::from)?;

        let mut result = Value::object();
        result.set_member("album_cover_uri", Value::String(uri))?;
        Ok(Outcome::Immediate(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aimpctl_covers::source::{CoverContainer, ScalingBackend};
    use std::path::Path;
    use tempfile::tempdir;

    struct EmptySource;
    impl CoverSource for EmptySource {
        fn cover_file_path(&self, _track: TrackDescription) -> Option<std::path::PathBuf> {
            None
        }
        fn cover_container(&self, _track: TrackDescription) -> Option<CoverContainer> {
            None
        }
        fn content_hash(&self, _track: TrackDescription) -> Option<u32> {
            None
        }
        fn now_playing(&self) -> Option<TrackDescription> {
            Some(TrackDescription::new(1, 1))
        }
    }

    struct NoopScaler;
    impl ScalingBackend for NoopScaler {
        fn render_scaled(
            &self,
            _track: TrackDescription,
            _width: u32,
            _height: u32,
            dest: &Path,
        ) -> aimpctl_covers::Result<()> {
            std::fs::write(dest, b"fake").map_err(aimpctl_covers::CoverError::Io)
        }
    }

    #[tokio::test]
    async fn missing_playlist_id_is_a_type_error() {
        let dir = tempdir().unwrap();
        let source = Arc::new(EmptySource);
        let service = Arc::new(
            CoverService::new(dir.path().join("covers"), dir.path().to_owned(), source, Arc::new(NoopScaler)).unwrap(),
        );
        let method = GetAlbumCoverUri::new(service);
        let (tx, _rx) = tokio::sync::oneshot::channel();
        let err = method.invoke(Value::object(), DelayedSender::new(tx)).await.unwrap_err();
        assert_eq!(err.code(), 5);
    }
}
