//! The cover cache: three lookup axes (track descriptor, source file path,
//! content hash) that must all resolve to the same generated entries.

use aimpctl_value::TrackDescription;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct CoverCacheEntry {
    pub uri: String,
    pub width: u32,
    pub height: u32,
}

impl CoverCacheEntry {
    fn size_tag(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

#[derive(Default)]
pub struct CoverCache {
    by_track: HashMap<TrackDescription, Vec<CoverCacheEntry>>,
    by_path: HashMap<PathBuf, TrackDescription>,
    by_hash: HashMap<u32, TrackDescription>,
}

impl CoverCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe by track descriptor, filtering by the requested `WxH`.
    pub fn lookup_by_track(&self, track: TrackDescription, width: u32, height: u32) -> Option<&CoverCacheEntry> {
        let tag = format!("{width}x{height}");
        self.by_track
            .get(&track)
            .and_then(|entries| entries.iter().find(|e| e.size_tag() == tag))
    }

    pub fn lookup_by_path(&self, path: &std::path::Path) -> Option<TrackDescription> {
        self.by_path.get(path).copied()
    }

    pub fn lookup_by_hash(&self, hash: u32) -> Option<TrackDescription> {
        self.by_hash.get(&hash).copied()
    }

    /// Registers a freshly generated entry under every applicable key.
    pub fn insert(
        &mut self,
        track: TrackDescription,
        entry: CoverCacheEntry,
        path: Option<PathBuf>,
        hash: Option<u32>,
    ) {
        self.by_track.entry(track).or_default().push(entry);
        if let Some(path) = path {
            self.by_path.insert(path, track);
        }
        if let Some(hash) = hash {
            self.by_hash.insert(hash, track);
        }
    }

    pub fn clear(&mut self) {
        self.by_track.clear();
        self.by_path.clear();
        self.by_hash.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_track_filters_by_requested_size() {
        let mut cache = CoverCache::new();
        let track = TrackDescription::new(1, 2);
        cache.insert(
            track,
            CoverCacheEntry {
                uri: "covers/a.png".into(),
                width: 100,
                height: 100,
            },
            None,
            None,
        );
        assert!(cache.lookup_by_track(track, 100, 100).is_some());
        assert!(cache.lookup_by_track(track, 200, 200).is_none());
    }

    #[test]
    fn path_and_hash_keys_resolve_to_the_same_track() {
        let mut cache = CoverCache::new();
        let track = TrackDescription::new(3, 4);
        let path = PathBuf::from("/music/cover.jpg");
        cache.insert(
            track,
            CoverCacheEntry {
                uri: "covers/b.jpg".into(),
                width: 0,
                height: 0,
            },
            Some(path.clone()),
            Some(42),
        );
        assert_eq!(cache.lookup_by_path(&path), Some(track));
        assert_eq!(cache.lookup_by_hash(42), Some(track));
    }
}
