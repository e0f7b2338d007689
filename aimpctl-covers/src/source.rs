//! The player backend is out of scope, so this module only defines the
//! narrow surface the cover resolution procedure needs from it. A real
//! integration supplies these trait objects; tests use a stub.

use aimpctl_value::TrackDescription;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverFormat {
    Bmp,
    Gif,
    Jpg,
    Png,
    Unknown,
}

impl CoverFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            CoverFormat::Bmp => "bmp",
            CoverFormat::Gif => "gif",
            CoverFormat::Jpg => "jpg",
            CoverFormat::Png => "png",
            CoverFormat::Unknown => "",
        }
    }
}

/// Raw cover-art bytes as held by the player's in-memory container, with no
/// backing file on disk.
pub struct CoverContainer {
    pub bytes: Vec<u8>,
    pub format: CoverFormat,
}

/// What the cover resolver can learn about a track's artwork from the
/// player backend, without yet generating any file.
pub trait CoverSource: Send + Sync {
    fn cover_file_path(&self, track: TrackDescription) -> Option<PathBuf>;
    fn cover_container(&self, track: TrackDescription) -> Option<CoverContainer>;
    fn content_hash(&self, track: TrackDescription) -> Option<u32>;
    fn now_playing(&self) -> Option<TrackDescription>;
}

/// Renders a rescaled copy of a track's cover art to `dest`. Only invoked
/// once the source's direct-copy and raw-container paths have been ruled
/// out by the resolution procedure.
pub trait ScalingBackend: Send + Sync {
    fn render_scaled(
        &self,
        track: TrackDescription,
        width: u32,
        height: u32,
        dest: &std::path::Path,
    ) -> crate::error::Result<()>;
}

/// Default scaler: reads the source's known file path (if any) and writes a
/// resized PNG with the `image` crate. Tracks with no file path and no
/// in-memory container cannot be rescaled by this backend.
pub struct ImageCrateScaler<S: CoverSource> {
    source: std::sync::Arc<S>,
}

impl<S: CoverSource> ImageCrateScaler<S> {
    pub fn new(source: std::sync::Arc<S>) -> Self {
        Self { source }
    }
}

impl<S: CoverSource> ScalingBackend for ImageCrateScaler<S> {
    fn render_scaled(
        &self,
        track: TrackDescription,
        width: u32,
        height: u32,
        dest: &std::path::Path,
    ) -> crate::error::Result<()> {
        let image = if let Some(path) = self.source.cover_file_path(track) {
            image::open(path)?
        } else if let Some(container) = self.source.cover_container(track) {
            image::load_from_memory(&container.bytes)?
        } else {
            return Err(crate::error::CoverError::NoCoverAvailable);
        };
        let scaled = image.resize_exact(width, height, image::imageops::FilterType::Lanczos3);
        scaled.save(dest)?;
        Ok(())
    }
}
