//! The cover-art resolution procedure: cache probing across three axes,
//! falling back to direct copy, raw-container dump, or rescaling.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use aimpctl_value::TrackDescription;
use rand::Rng;
use tokio::sync::Mutex;

use crate::cache::{CoverCache, CoverCacheEntry};
use crate::error::{CoverError, Result};
use crate::source::{CoverSource, ScalingBackend};

const MAX_DIMENSION: u32 = 2000;

pub struct CoverService<S: CoverSource> {
    cache: Mutex<CoverCache>,
    cover_dir: PathBuf,
    document_root: PathBuf,
    source: Arc<S>,
    scaler: Arc<dyn ScalingBackend>,
}

impl<S: CoverSource> CoverService<S> {
    /// Empties and recreates `cover_dir`, matching the startup contract.
    pub fn new(
        cover_dir: PathBuf,
        document_root: PathBuf,
        source: Arc<S>,
        scaler: Arc<dyn ScalingBackend>,
    ) -> std::io::Result<Self> {
        if cover_dir.exists() {
            std::fs::remove_dir_all(&cover_dir)?;
        }
        std::fs::create_dir_all(&cover_dir)?;
        Ok(Self {
            cache: Mutex::new(CoverCache::new()),
            cover_dir,
            document_root,
            source,
            scaler,
        })
    }

    pub async fn resolve(&self, track: TrackDescription, width: u32, height: u32) -> Result<String> {
        let width = width.min(MAX_DIMENSION);
        let height = height.min(MAX_DIMENSION);
        let track = track.resolve(self.source.now_playing())?;

        let mut cache = self.cache.lock().await;
        if let Some(entry) = cache.lookup_by_track(track, width, height) {
            return Ok(entry.uri.clone());
        }

        let file_path = self.source.cover_file_path(track);
        if let Some(existing) = file_path
            .as_ref()
            .and_then(|path| cache.lookup_by_path(path))
            .and_then(|owner| cache.lookup_by_track(owner, width, height))
        {
            return Ok(existing.uri.clone());
        }

        let hash = self.source.content_hash(track);
        if let Some(existing) = hash
            .and_then(|h| cache.lookup_by_hash(h))
            .and_then(|owner| cache.lookup_by_track(owner, width, height))
        {
            return Ok(existing.uri.clone());
        }

        let original_size = width == 0 && height == 0;
        let extension = self.pick_extension(track, original_size);
        let filename = generate_filename(track, width, height, &extension);
        let dest = self.cover_dir.join(&filename);

        if original_size {
            if let Some(path) = &file_path {
                std::fs::copy(path, &dest)?;
            } else if let Some(container) = self.source.cover_container(track) {
                std::fs::write(&dest, &container.bytes)?;
            } else {
                return Err(CoverError::NoCoverAvailable);
            }
        } else {
            self.scaler.render_scaled(track, width, height, &dest)?;
        }

        let uri = relative_uri(&self.document_root, &dest);
        cache.insert(
            track,
            CoverCacheEntry {
                uri: uri.clone(),
                width,
                height,
            },
            file_path,
            hash,
        );
        Ok(uri)
    }

    fn pick_extension(&self, track: TrackDescription, original_size: bool) -> String {
        if !original_size {
            return "png".to_owned();
        }
        if let Some(path) = self.source.cover_file_path(track) {
            if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                return ext.to_owned();
            }
        }
        if let Some(container) = self.source.cover_container(track) {
            return container.format.extension().to_owned();
        }
        String::new()
    }
}

fn generate_filename(track: TrackDescription, width: u32, height: u32, extension: &str) -> String {
    let suffix: u32 = rand::rng().random_range(0..100_000);
    if extension.is_empty() {
        format!(
            "cover_{}_{}_{}x{}_{:05}",
            track.playlist_id, track.track_id, width, height, suffix
        )
    } else {
        format!(
            "cover_{}_{}_{}x{}_{:05}.{}",
            track.playlist_id, track.track_id, width, height, suffix, extension
        )
    }
}

fn relative_uri(document_root: &Path, dest: &Path) -> String {
    dest.strip_prefix(document_root)
        .unwrap_or(dest)
        .to_string_lossy()
        .replace(std::path::MAIN_SEPARATOR, "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{CoverContainer, CoverFormat};
    use std::sync::Mutex as StdMutex;

    struct StubSource {
        path: StdMutex<Option<PathBuf>>,
        now_playing: Option<TrackDescription>,
    }

    impl CoverSource for StubSource {
        fn cover_file_path(&self, _track: TrackDescription) -> Option<PathBuf> {
            self.path.lock().unwrap().clone()
        }
        fn cover_container(&self, _track: TrackDescription) -> Option<CoverContainer> {
            None
        }
        fn content_hash(&self, _track: TrackDescription) -> Option<u32> {
            None
        }
        fn now_playing(&self) -> Option<TrackDescription> {
            self.now_playing
        }
    }

    struct NoopScaler;
    impl ScalingBackend for NoopScaler {
        fn render_scaled(&self, _track: TrackDescription, _w: u32, _h: u32, dest: &Path) -> Result<()> {
            std::fs::write(dest, b"scaled").map_err(CoverError::from)
        }
    }

    #[tokio::test]
    async fn original_size_copies_the_source_file_directly() {
        let tmp = tempfile::tempdir().unwrap();
        let source_file = tmp.path().join("art.jpg");
        std::fs::write(&source_file, b"jpeg-bytes").unwrap();
        let cover_dir = tmp.path().join("covers");
        let document_root = tmp.path().to_path_buf();

        let source = Arc::new(StubSource {
            path: StdMutex::new(Some(source_file)),
            now_playing: None,
        });
        let service = CoverService::new(cover_dir, document_root, source, Arc::new(NoopScaler)).unwrap();

        let uri = service
            .resolve(TrackDescription::new(1, 2), 0, 0)
            .await
            .unwrap();
        assert!(uri.starts_with("covers/cover_1_2_0x0_"));
        assert!(uri.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn second_request_for_same_size_hits_the_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let source_file = tmp.path().join("art.png");
        std::fs::write(&source_file, b"png-bytes").unwrap();
        let source = Arc::new(StubSource {
            path: StdMutex::new(Some(source_file)),
            now_playing: None,
        });
        let service = CoverService::new(
            tmp.path().join("covers"),
            tmp.path().to_path_buf(),
            source,
            Arc::new(NoopScaler),
        )
        .unwrap();

        let first = service.resolve(TrackDescription::new(5, 6), 0, 0).await.unwrap();
        let second = service.resolve(TrackDescription::new(5, 6), 0, 0).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn nonzero_dimensions_delegate_to_scaler() {
        let tmp = tempfile::tempdir().unwrap();
        let source = Arc::new(StubSource {
            path: StdMutex::new(None),
            now_playing: None,
        });
        let service = CoverService::new(
            tmp.path().join("covers"),
            tmp.path().to_path_buf(),
            source,
            Arc::new(NoopScaler),
        )
        .unwrap();

        let uri = service.resolve(TrackDescription::new(1, 1), 200, 150).await.unwrap();
        assert!(uri.contains("200x150"));
        assert!(uri.ends_with(".png"));
    }

    #[tokio::test]
    async fn sentinel_descriptor_without_now_playing_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let source = Arc::new(StubSource {
            path: StdMutex::new(None),
            now_playing: None,
        });
        let service = CoverService::new(
            tmp.path().join("covers"),
            tmp.path().to_path_buf(),
            source,
            Arc::new(NoopScaler),
        )
        .unwrap();

        let err = service
            .resolve(TrackDescription::new(-1, -1), 0, 0)
            .await
            .unwrap_err();
        assert_eq!(err.code(), 21);
    }
}
