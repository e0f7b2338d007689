//! The relational persistence layer: playlist/entry/queue tables, the
//! `GetPlaylistEntries` query compiler, and the CRC32 content-hash fold.

pub mod crc;
pub mod error;
pub mod field;
pub mod query;
pub mod schema;
pub mod store;

pub use error::{Error, Result};
pub use field::{EntryField, OrderDir, PlaylistField};
pub use query::{CompiledEntriesQuery, EntriesQuerySpec};
pub use store::{EntriesOutcome, EntryInfo, EntryRows, PlaylistRow, Store};
