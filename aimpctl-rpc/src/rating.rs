//! Rating writes: delegate to the backend's native support when available,
//! otherwise append a line to a UTF-16 text ledger.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use aimpctl_value::TrackDescription;

use crate::player::PlayerBackend;

#[derive(Debug, thiserror::Error)]
pub enum RatingError {
    #[error("rating could not be set")]
    SetFailed,
    #[error("io error writing rating ledger: {0}")]
    Io(#[from] std::io::Error),
}

pub struct RatingWriter {
    fallback_path: PathBuf,
}

impl RatingWriter {
    pub fn new(fallback_path: impl Into<PathBuf>) -> Self {
        Self { fallback_path: fallback_path.into() }
    }

    /// Clamps `rating` into `[0,5]` and writes it, preferring the backend's
    /// native path.
    pub fn set_rating(
        &self,
        backend: &dyn PlayerBackend,
        track: TrackDescription,
        filename: &str,
        rating: i32,
    ) -> Result<(), RatingError> {
        let clamped = rating.clamp(0, 5);
        match backend.set_native_rating(track, clamped) {
            Some(Ok(())) => Ok(()),
            Some(Err(_)) => Err(RatingError::SetFailed),
            None => self.append_to_ledger(filename, clamped),
        }
    }

    fn append_to_ledger(&self, filename: &str, rating: i32) -> Result<(), RatingError> {
        if let Some(parent) = self.fallback_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let line = format!("{filename}; rating:{rating}\n");
        let utf16: Vec<u8> = line.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect();
        let mut file = OpenOptions::new().create(true).append(true).open(&self.fallback_path)?;
        file.write_all(&utf16)?;
        Ok(())
    }

    pub fn fallback_path(&self) -> &Path {
        &self.fallback_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::tests::StubBackend;
    use tempfile::tempdir;

    #[test]
    fn native_support_delegates_without_touching_the_ledger() {
        let dir = tempdir().unwrap();
        let ledger = dir.path().join("ratings.txt");
        let writer = RatingWriter::new(&ledger);
        let mut backend = StubBackend::default();
        backend.native_rating_supported = true;
        writer.set_rating(&backend, TrackDescription::new(1, 2), "song.mp3", 4).unwrap();
        assert_eq!(*backend.last_rating.lock().unwrap(), Some((TrackDescription::new(1, 2), 4)));
        assert!(!ledger.exists());
    }

    #[test]
    fn fallback_appends_utf16_line_with_clamped_rating() {
        let dir = tempdir().unwrap();
        let ledger = dir.path().join("ratings.txt");
        let writer = RatingWriter::new(&ledger);
        let backend = StubBackend::default();
        writer.set_rating(&backend, TrackDescription::new(1, 2), "song.mp3", 9).unwrap();

        let bytes = std::fs::read(&ledger).unwrap();
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        let text = String::from_utf16(&units).unwrap();
        assert_eq!(text, "song.mp3; rating:5\n");
    }

    #[test]
    fn repeated_writes_append_rather_than_overwrite() {
        let dir = tempdir().unwrap();
        let ledger = dir.path().join("ratings.txt");
        let writer = RatingWriter::new(&ledger);
        let backend = StubBackend::default();
        writer.set_rating(&backend, TrackDescription::new(1, 2), "a.mp3", 1).unwrap();
        writer.set_rating(&backend, TrackDescription::new(1, 3), "b.mp3", 2).unwrap();

        let bytes = std::fs::read(&ledger).unwrap();
        let units: Vec<u16> = bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
        let text = String::from_utf16(&units).unwrap();
        assert_eq!(text, "a.mp3; rating:1\nb.mp3; rating:2\n");
    }
}
