//! Playlist content hashing. Two CRC32 folds — one over playlist properties,
//! one over the ordered entry list — combined into the playlist's `crc32`
//! field so a client can detect either without downloading the other.

use crc32fast::Hasher;

#[derive(Debug, Clone, Default)]
pub struct PlaylistProperties {
    pub title: String,
    pub entries_count: i64,
    pub duration: i64,
    pub size_of_entries: i64,
}

#[derive(Debug, Clone, Default)]
pub struct EntryCrcFields {
    pub album: String,
    pub artist: String,
    pub date: String,
    pub filename: String,
    pub genre: String,
    pub title: String,
    pub bitrate: i64,
    pub channels_count: i64,
    pub duration: i64,
    pub filesize: i64,
    pub rating: i64,
    pub samplerate: i64,
}

fn fold_properties(hasher: &mut Hasher, title: &str, entries_count: i64, duration: i64, size_of_entries: i64) {
    hasher.update(title.as_bytes());
    hasher.update(&entries_count.to_le_bytes());
    hasher.update(&duration.to_le_bytes());
    hasher.update(&size_of_entries.to_le_bytes());
}

fn fold_entry(hasher: &mut Hasher, entry: &EntryCrcFields) {
    hasher.update(entry.album.as_bytes());
    hasher.update(entry.artist.as_bytes());
    hasher.update(entry.date.as_bytes());
    hasher.update(entry.filename.as_bytes());
    hasher.update(entry.genre.as_bytes());
    hasher.update(entry.title.as_bytes());
    hasher.update(&entry.bitrate.to_le_bytes());
    hasher.update(&entry.channels_count.to_le_bytes());
    hasher.update(&entry.duration.to_le_bytes());
    hasher.update(&entry.filesize.to_le_bytes());
    hasher.update(&entry.rating.to_le_bytes());
    hasher.update(&entry.samplerate.to_le_bytes());
}

/// Folds playlist properties and its entries (already in playlist order)
/// into the combined `crc32` value stored on the `Playlists` row.
pub fn fold_playlist(title: &str, entries_count: i64, duration: i64, size_of_entries: i64, entries: &[EntryCrcFields]) -> u32 {
    let mut props_hasher = Hasher::new();
    fold_properties(&mut props_hasher, title, entries_count, duration, size_of_entries);
    let properties_crc = props_hasher.finalize();

    let mut entries_hasher = Hasher::new();
    for entry in entries {
        fold_entry(&mut entries_hasher, entry);
    }
    let entries_crc = entries_hasher.finalize();

    let mut combined = Hasher::new();
    combined.update(&properties_crc.to_le_bytes());
    combined.update(&entries_crc.to_le_bytes());
    combined.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_playlist_is_deterministic() {
        let a = fold_playlist("Empty", 0, 0, 0, &[]);
        let b = fold_playlist("Empty", 0, 0, 0, &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn changing_an_entry_changes_the_combined_crc() {
        let entry = EntryCrcFields {
            title: "Track A".into(),
            ..Default::default()
        };
        let other = EntryCrcFields {
            title: "Track B".into(),
            ..Default::default()
        };
        let a = fold_playlist("List", 1, 100, 1000, &[entry]);
        let b = fold_playlist("List", 1, 100, 1000, &[other]);
        assert_ne!(a, b);
    }

    #[test]
    fn entry_order_is_significant() {
        let first = EntryCrcFields {
            title: "First".into(),
            ..Default::default()
        };
        let second = EntryCrcFields {
            title: "Second".into(),
            ..Default::default()
        };
        let forward = fold_playlist("List", 2, 0, 0, &[first.clone(), second.clone()]);
        let reversed = fold_playlist("List", 2, 0, 0, &[second, first]);
        assert_ne!(forward, reversed);
    }

    #[test]
    fn properties_alone_affect_the_combined_crc() {
        let a = fold_playlist("List", 0, 0, 0, &[]);
        let b = fold_playlist("List", 0, 1, 0, &[]);
        assert_ne!(a, b);
    }
}
