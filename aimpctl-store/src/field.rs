//! The field universe for the `GetPlaylistEntries` family, kept as a
//! first-class enum so the projection list, the RPC-name-to-column
//! translation table, the orderable-field list and the filterable-field
//! list can never typo out of sync with each other.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryField {
    Id,
    Title,
    Artist,
    Album,
    Date,
    Genre,
    Bitrate,
    Duration,
    Filesize,
    Rating,
    /// Derived field: the parent directory of `filename`.
    Foldername,
    /// Only meaningful (and only offered) in queued-entries mode.
    PlaylistId,
    QueueIndex,
}

impl EntryField {
    /// Parses the RPC-facing field name. Unknown names yield `None` so
    /// callers can silently drop them, per the ordering rule in §4.5.
    pub fn parse(name: &str) -> Option<EntryField> {
        Some(match name {
            "id" => EntryField::Id,
            "title" => EntryField::Title,
            "artist" => EntryField::Artist,
            "album" => EntryField::Album,
            "date" => EntryField::Date,
            "genre" => EntryField::Genre,
            "bitrate" => EntryField::Bitrate,
            "duration" => EntryField::Duration,
            "filesize" => EntryField::Filesize,
            "rating" => EntryField::Rating,
            "foldername" => EntryField::Foldername,
            "playlist_id" => EntryField::PlaylistId,
            "queue_index" => EntryField::QueueIndex,
            _ => return None,
        })
    }

    /// The RPC name this field is exposed under (round-trips `parse`).
    pub fn rpc_name(&self) -> &'static str {
        match self {
            EntryField::Id => "id",
            EntryField::Title => "title",
            EntryField::Artist => "artist",
            EntryField::Album => "album",
            EntryField::Date => "date",
            EntryField::Genre => "genre",
            EntryField::Bitrate => "bitrate",
            EntryField::Duration => "duration",
            EntryField::Filesize => "filesize",
            EntryField::Rating => "rating",
            EntryField::Foldername => "foldername",
            EntryField::PlaylistId => "playlist_id",
            EntryField::QueueIndex => "queue_index",
        }
    }

    /// The underlying database column this field is read from. `foldername`
    /// reads `filename` and is post-processed to extract the directory.
    pub fn db_column(&self) -> &'static str {
        match self {
            EntryField::Id => "entry_id",
            EntryField::Title => "title",
            EntryField::Artist => "artist",
            EntryField::Album => "album",
            EntryField::Date => "date",
            EntryField::Genre => "genre",
            EntryField::Bitrate => "bitrate",
            EntryField::Duration => "duration",
            EntryField::Filesize => "filesize",
            EntryField::Rating => "rating",
            EntryField::Foldername => "filename",
            EntryField::PlaylistId => "playlist_id",
            EntryField::QueueIndex => "queue_index",
        }
    }

    /// Whether this field is allowed in `order_fields`.
    pub fn orderable(&self) -> bool {
        matches!(
            self,
            EntryField::Id
                | EntryField::Title
                | EntryField::Artist
                | EntryField::Album
                | EntryField::Date
                | EntryField::Genre
                | EntryField::Bitrate
                | EntryField::Duration
                | EntryField::Filesize
                | EntryField::Rating
        )
    }

    /// The fixed set of fields `search_string` filters across.
    pub fn filterable_fields() -> &'static [EntryField] {
        &[
            EntryField::Title,
            EntryField::Artist,
            EntryField::Album,
            EntryField::Date,
            EntryField::Genre,
        ]
    }

    pub const DEFAULT_FIELDS: &'static [EntryField] = &[EntryField::Id, EntryField::Title];

    /// Every addressable entry field, used when a format string needs the
    /// full record to render against rather than a hand-picked projection.
    pub const ALL_FIELDS: &'static [EntryField] = &[
        EntryField::Id,
        EntryField::Title,
        EntryField::Artist,
        EntryField::Album,
        EntryField::Date,
        EntryField::Genre,
        EntryField::Bitrate,
        EntryField::Duration,
        EntryField::Filesize,
        EntryField::Rating,
        EntryField::Foldername,
    ];
}

impl fmt::Display for EntryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rpc_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDir {
    Asc,
    Desc,
}

impl OrderDir {
    pub fn parse(s: &str) -> OrderDir {
        if s.eq_ignore_ascii_case("desc") {
            OrderDir::Desc
        } else {
            OrderDir::Asc
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            OrderDir::Asc => "ASC",
            OrderDir::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistField {
    Id,
    Title,
    Duration,
    EntriesCount,
    SizeOfEntries,
    Crc32,
}

impl PlaylistField {
    pub fn parse(name: &str) -> Option<PlaylistField> {
        Some(match name {
            "id" => PlaylistField::Id,
            "title" => PlaylistField::Title,
            "duration" => PlaylistField::Duration,
            "entries_count" => PlaylistField::EntriesCount,
            "size_of_entries" => PlaylistField::SizeOfEntries,
            "crc32" => PlaylistField::Crc32,
            _ => return None,
        })
    }

    pub fn rpc_name(&self) -> &'static str {
        match self {
            PlaylistField::Id => "id",
            PlaylistField::Title => "title",
            PlaylistField::Duration => "duration",
            PlaylistField::EntriesCount => "entries_count",
            PlaylistField::SizeOfEntries => "size_of_entries",
            PlaylistField::Crc32 => "crc32",
        }
    }

    pub fn db_column(&self) -> &'static str {
        match self {
            PlaylistField::Id => "id",
            PlaylistField::Title => "title",
            PlaylistField::Duration => "duration",
            PlaylistField::EntriesCount => "entries_count",
            PlaylistField::SizeOfEntries => "size_of_entries",
            PlaylistField::Crc32 => "crc32",
        }
    }

    pub const DEFAULT_FIELDS: &'static [PlaylistField] = &[PlaylistField::Id, PlaylistField::Title];
}
