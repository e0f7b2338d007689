//! The relational store: a thin, explicitly-constructed wrapper around a
//! single SQLite connection. No process-wide singleton — every caller holds
//! its own `Arc<Store>` and passes it down through constructors, per the
//! "no mutable global state" redesign.

use std::path::Path;

use aimpctl_value::{TrackDescription, Value};
use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::crc::{fold_playlist, EntryCrcFields};
use crate::error::{Error, Result};
use crate::field::EntryField;
use crate::query::{CompiledEntriesQuery, EntriesQuerySpec};
use crate::schema;

pub struct Store {
    conn: Mutex<Connection>,
}

#[derive(Debug, Clone)]
pub struct PlaylistRow {
    pub id: i32,
    pub playlist_index: i32,
    pub title: String,
    pub entries_count: i64,
    pub duration: i64,
    pub size_of_entries: i64,
    pub crc32: u32,
}

#[derive(Debug, Clone, Default)]
pub struct EntryInfo {
    pub playlist_id: i32,
    pub entry_id: i32,
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

impl EntryInfo {
    pub fn field_value(&self, field: EntryField) -> Value {
        match field {
            EntryField::Id => Value::from(self.entry_id),
            EntryField::Title => Value::from(self.title.clone()),
            EntryField::Artist => Value::from(self.artist.clone()),
            EntryField::Album => Value::from(self.album.clone()),
            EntryField::Date => Value::from(self.date.clone()),
            EntryField::Genre => Value::from(self.genre.clone()),
            EntryField::Bitrate => Value::from(self.bitrate as i32),
            EntryField::Duration => Value::from(self.duration as i32),
            EntryField::Filesize => Value::from(self.filesize as i32),
            EntryField::Rating => Value::from(self.rating as i32),
            EntryField::Foldername => Value::from(
                Path::new(&self.filename)
                    .parent()
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            ),
            EntryField::PlaylistId => Value::from(self.playlist_id),
            EntryField::QueueIndex => Value::Null,
        }
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryInfo> {
        Ok(EntryInfo {
            playlist_id: row.get("playlist_id")?,
            entry_id: row.get("entry_id")?,
            album: row.get("album")?,
            artist: row.get("artist")?,
            date: row.get("date")?,
            filename: row.get("filename")?,
            genre: row.get("genre")?,
            title: row.get("title")?,
            bitrate: row.get("bitrate")?,
            channels_count: row.get("channels_count")?,
            duration: row.get("duration")?,
            filesize: row.get("filesize")?,
            rating: row.get("rating")?,
            samplerate: row.get("samplerate")?,
        })
    }
}

pub enum EntryRows {
    /// Each row is the caller-selected projection, column order preserved.
    Fields(Vec<Vec<(EntryField, Value)>>),
    /// A format string was supplied; callers run their own formatter over
    /// the full record of each row.
    FullRecords(Vec<EntryInfo>),
}

pub struct EntriesOutcome {
    pub total_entries_count: i64,
    pub count_of_found_entries: i64,
    pub rows: EntryRows,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(path)?;
        schema::bootstrap(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::bootstrap(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub async fn get_playlists(&self) -> Result<Vec<PlaylistRow>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, playlist_index, title, entries_count, duration, size_of_entries, crc32
             FROM Playlists ORDER BY playlist_index ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(PlaylistRow {
                    id: row.get(0)?,
                    playlist_index: row.get(1)?,
                    title: row.get(2)?,
                    entries_count: row.get(3)?,
                    duration: row.get(4)?,
                    size_of_entries: row.get(5)?,
                    crc32: row.get::<_, i64>(6)? as u32,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub async fn get_playlist_entries(&self, spec: EntriesQuerySpec) -> Result<EntriesOutcome> {
        let compiled = CompiledEntriesQuery::compile(&spec);
        let conn = self.conn.lock().await;

        let total_entries_count: i64 = if compiled.queued_mode {
            conn.query_row(&compiled.total_count_sql(), [], |r| r.get(0))?
        } else {
            conn.query_row(
                &compiled.total_count_sql(),
                [spec.playlist_id.unwrap_or(0)],
                |r| r.get(0),
            )?
        };

        let count_of_found_entries: i64 =
            conn.query_row(&compiled.count_of_found_sql(), rusqlite::params_from_iter(compiled.params()), |r| {
                r.get(0)
            })?;

        let sql = compiled.select_sql();
        let mut stmt = conn.prepare(&sql)?;
        let rows = if compiled.format_mode {
            let records = stmt
                .query_map(rusqlite::params_from_iter(compiled.params()), EntryInfo::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            EntryRows::FullRecords(records)
        } else {
            let projection = compiled.projection.clone();
            let projection_for_map = projection.clone();
            let records = stmt
                .query_map(rusqlite::params_from_iter(compiled.params()), move |row| {
                    let mut out = Vec::with_capacity(projection_for_map.len());
                    for (idx, field) in projection_for_map.iter().enumerate() {
                        let value = row_value_for_field(row, idx, *field)?;
                        out.push((*field, value));
                    }
                    Ok(out)
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            EntryRows::Fields(records)
        };

        Ok(EntriesOutcome {
            total_entries_count,
            count_of_found_entries,
            rows,
        })
    }

    pub async fn get_entry_position_in_data_table(
        &self,
        mut spec: EntriesQuerySpec,
        entry_id: i32,
    ) -> Result<Option<i64>> {
        spec.entries_count = None;
        spec.start_index = None;
        spec.fields = vec![EntryField::Id];
        let compiled = CompiledEntriesQuery::compile(&spec);
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&compiled.select_sql_without_limit())?;
        let ids = stmt
            .query_map(rusqlite::params_from_iter(compiled.params()), |r| {
                r.get::<_, i32>(0)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids.iter().position(|id| *id == entry_id).map(|p| p as i64))
    }

    pub async fn get_queued_entries(&self, fields: Vec<EntryField>) -> Result<EntriesOutcome> {
        let spec = EntriesQuerySpec {
            queued_mode: true,
            fields,
            ..Default::default()
        };
        self.get_playlist_entries(spec).await
    }

    pub async fn get_playlist_entry_info(&self, playlist_id: i32, entry_id: i32) -> Result<EntryInfo> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT playlist_id, entry_id, album, artist, date, filename, genre, title,
                    bitrate, channels_count, duration, filesize, rating, samplerate
             FROM PlaylistsEntries WHERE playlist_id = ?1 AND entry_id = ?2",
            rusqlite::params![playlist_id, entry_id],
            EntryInfo::from_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Error::TrackNotFound {
                playlist_id,
                track_id: entry_id,
            },
            other => Error::Persistence(other),
        })
    }

    pub async fn get_playlist_entries_count(&self, playlist_id: i32) -> Result<i64> {
        let conn = self.conn.lock().await;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM PlaylistsEntries WHERE playlist_id = ?1",
            [playlist_id],
            |r| r.get(0),
        )?;
        Ok(count)
    }

    /// Removes a single entry row from its playlist, used by the
    /// playlist-entry deletion control method. Does not touch the
    /// filesystem; the caller deletes the backing file separately when
    /// physical deletion is requested.
    pub async fn remove_playlist_entry(&self, desc: TrackDescription) -> Result<()> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "DELETE FROM PlaylistsEntries WHERE playlist_id = ?1 AND entry_id = ?2",
            rusqlite::params![desc.playlist_id, desc.track_id],
        )?;
        if changed == 0 {
            return Err(Error::TrackNotFound {
                playlist_id: desc.playlist_id,
                track_id: desc.track_id,
            });
        }
        Ok(())
    }

    pub async fn enqueue_track(&self, desc: TrackDescription, insert_at_beginning: bool) -> Result<()> {
        let conn = self.conn.lock().await;
        let index: i64 = if insert_at_beginning {
            conn.execute("UPDATE QueuedEntries SET queue_index = queue_index + 1", [])?;
            0
        } else {
            conn.query_row("SELECT COALESCE(MAX(queue_index), -1) + 1 FROM QueuedEntries", [], |r| r.get(0))?
        };
        conn.execute(
            "INSERT OR REPLACE INTO QueuedEntries (playlist_id, entry_id, queue_index) VALUES (?1, ?2, ?3)",
            rusqlite::params![desc.playlist_id, desc.track_id, index],
        )?;
        Ok(())
    }

    pub async fn remove_track_from_queue(&self, desc: TrackDescription) -> Result<()> {
        let conn = self.conn.lock().await;
        let removed_index: Option<i64> = conn
            .query_row(
                "SELECT queue_index FROM QueuedEntries WHERE playlist_id = ?1 AND entry_id = ?2",
                rusqlite::params![desc.playlist_id, desc.track_id],
                |r| r.get(0),
            )
            .ok();
        conn.execute(
            "DELETE FROM QueuedEntries WHERE playlist_id = ?1 AND entry_id = ?2",
            rusqlite::params![desc.playlist_id, desc.track_id],
        )?;
        if let Some(removed_index) = removed_index {
            conn.execute(
                "UPDATE QueuedEntries SET queue_index = queue_index - 1 WHERE queue_index > ?1",
                [removed_index],
            )?;
        }
        Ok(())
    }

    pub async fn queue_track_move(&self, desc: TrackDescription, new_index: i64) -> Result<()> {
        let conn = self.conn.lock().await;
        let old_index: i64 = conn.query_row(
            "SELECT queue_index FROM QueuedEntries WHERE playlist_id = ?1 AND entry_id = ?2",
            rusqlite::params![desc.playlist_id, desc.track_id],
            |r| r.get(0),
        )?;
        Self::shift_queue(&conn, desc.playlist_id as i64, desc.track_id as i64, old_index, new_index)
    }

    /// Same move, but the row is identified by its current queue position
    /// rather than a playlist/entry pair.
    pub async fn queue_track_move_by_index(&self, old_index: i64, new_index: i64) -> Result<()> {
        let conn = self.conn.lock().await;
        let (playlist_id, entry_id): (i64, i64) = conn.query_row(
            "SELECT playlist_id, entry_id FROM QueuedEntries WHERE queue_index = ?1",
            [old_index],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        Self::shift_queue(&conn, playlist_id, entry_id, old_index, new_index)
    }

    fn shift_queue(conn: &rusqlite::Connection, playlist_id: i64, entry_id: i64, old_index: i64, new_index: i64) -> Result<()> {
        if old_index == new_index {
            return Ok(());
        }
        if new_index > old_index {
            conn.execute(
                "UPDATE QueuedEntries SET queue_index = queue_index - 1 WHERE queue_index > ?1 AND queue_index <= ?2",
                rusqlite::params![old_index, new_index],
            )?;
        } else {
            conn.execute(
                "UPDATE QueuedEntries SET queue_index = queue_index + 1 WHERE queue_index >= ?1 AND queue_index < ?2",
                rusqlite::params![new_index, old_index],
            )?;
        }
        conn.execute(
            "UPDATE QueuedEntries SET queue_index = ?1 WHERE playlist_id = ?2 AND entry_id = ?3",
            rusqlite::params![new_index, playlist_id, entry_id],
        )?;
        Ok(())
    }

    pub async fn set_track_rating(&self, desc: TrackDescription, rating: i32) -> Result<()> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE PlaylistsEntries SET rating = ?1 WHERE playlist_id = ?2 AND entry_id = ?3",
            rusqlite::params![rating, desc.playlist_id, desc.track_id],
        )?;
        if changed == 0 {
            return Err(Error::TrackNotFound {
                playlist_id: desc.playlist_id,
                track_id: desc.track_id,
            });
        }
        Ok(())
    }

    /// Recomputes and persists a playlist's `crc32` column from its current
    /// properties and entries, per the combined-fold invariant.
    pub async fn recompute_playlist_crc32(&self, playlist_id: i32) -> Result<u32> {
        let conn = self.conn.lock().await;
        let (title, entries_count, duration, size_of_entries): (String, i64, i64, i64) = conn.query_row(
            "SELECT title, entries_count, duration, size_of_entries FROM Playlists WHERE id = ?1",
            [playlist_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        ).map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Error::PlaylistNotFound(playlist_id),
            other => Error::Persistence(other),
        })?;

        let mut stmt = conn.prepare(
            "SELECT album, artist, date, filename, genre, title, bitrate, channels_count,
                    duration, filesize, rating, samplerate
             FROM PlaylistsEntries WHERE playlist_id = ?1 ORDER BY entry_index ASC",
        )?;
        let entries = stmt
            .query_map([playlist_id], |row| {
                Ok(EntryCrcFields {
                    album: row.get(0)?,
                    artist: row.get(1)?,
                    date: row.get(2)?,
                    filename: row.get(3)?,
                    genre: row.get(4)?,
                    title: row.get(5)?,
                    bitrate: row.get(6)?,
                    channels_count: row.get(7)?,
                    duration: row.get(8)?,
                    filesize: row.get(9)?,
                    rating: row.get(10)?,
                    samplerate: row.get(11)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let crc = fold_playlist(&title, entries_count, duration, size_of_entries, &entries);
        conn.execute(
            "UPDATE Playlists SET crc32 = ?1 WHERE id = ?2",
            rusqlite::params![crc as i64, playlist_id],
        )?;
        Ok(crc)
    }
}

fn row_value_for_field(row: &rusqlite::Row<'_>, idx: usize, field: EntryField) -> rusqlite::Result<Value> {
    Ok(match field {
        EntryField::Title
        | EntryField::Artist
        | EntryField::Album
        | EntryField::Date
        | EntryField::Genre
        | EntryField::Foldername => Value::from(row.get::<_, String>(idx)?),
        EntryField::Id | EntryField::PlaylistId => Value::from(row.get::<_, i32>(idx)?),
        EntryField::Bitrate
        | EntryField::Duration
        | EntryField::Filesize
        | EntryField::Rating
        | EntryField::QueueIndex => Value::from(row.get::<_, i32>(idx)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        {
            let conn = store.conn.lock().await;
            conn.execute(
                "INSERT INTO Playlists (id, playlist_index, title, entries_count, duration, size_of_entries, crc32)
                 VALUES (1, 0, 'My Playlist', 2, 300, 2048, 0)",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO PlaylistsEntries (playlist_id, entry_id, entry_index, title, artist, filename)
                 VALUES (1, 10, 0, 'Song A', 'Artist A', '/music/a/song.mp3')",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO PlaylistsEntries (playlist_id, entry_id, entry_index, title, artist, filename)
                 VALUES (1, 11, 1, 'Song B', 'Artist B', '/music/b/song.mp3')",
                [],
            )
            .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn get_playlists_returns_seeded_row() {
        let store = seeded_store().await;
        let playlists = store.get_playlists().await.unwrap();
        assert_eq!(playlists.len(), 1);
        assert_eq!(playlists[0].title, "My Playlist");
    }

    #[tokio::test]
    async fn get_playlist_entries_honors_default_projection() {
        let store = seeded_store().await;
        let outcome = store
            .get_playlist_entries(EntriesQuerySpec {
                playlist_id: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(outcome.total_entries_count, 2);
        assert_eq!(outcome.count_of_found_entries, 2);
        match outcome.rows {
            EntryRows::Fields(rows) => assert_eq!(rows.len(), 2),
            _ => panic!("expected field rows"),
        }
    }

    #[tokio::test]
    async fn search_string_narrows_found_count_but_not_total() {
        let store = seeded_store().await;
        let outcome = store
            .get_playlist_entries(EntriesQuerySpec {
                playlist_id: Some(1),
                search_string: Some("Song A".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(outcome.total_entries_count, 2);
        assert_eq!(outcome.count_of_found_entries, 1);
    }

    #[tokio::test]
    async fn entry_position_reflects_requested_order() {
        let store = seeded_store().await;
        let pos = store
            .get_entry_position_in_data_table(
                EntriesQuerySpec {
                    playlist_id: Some(1),
                    order_fields: vec![("title".into(), crate::field::OrderDir::Desc)],
                    ..Default::default()
                },
                10,
            )
            .await
            .unwrap();
        assert_eq!(pos, Some(1));
    }

    #[tokio::test]
    async fn enqueue_then_remove_keeps_queue_index_compact() {
        let store = seeded_store().await;
        store.enqueue_track(TrackDescription::new(1, 10), false).await.unwrap();
        store.enqueue_track(TrackDescription::new(1, 11), false).await.unwrap();
        store.remove_track_from_queue(TrackDescription::new(1, 10)).await.unwrap();
        let outcome = store.get_queued_entries(vec![EntryField::Id]).await.unwrap();
        match outcome.rows {
            EntryRows::Fields(rows) => {
                assert_eq!(rows.len(), 1);
            }
            _ => panic!("expected field rows"),
        }
    }

    #[tokio::test]
    async fn enqueue_at_beginning_shifts_prior_entries_and_takes_index_zero() {
        let store = seeded_store().await;
        store.enqueue_track(TrackDescription::new(1, 10), false).await.unwrap();
        store.enqueue_track(TrackDescription::new(1, 11), true).await.unwrap();
        let conn = store.conn.lock().await;
        let head: i32 = conn
            .query_row("SELECT entry_id FROM QueuedEntries WHERE queue_index = 0", [], |r| r.get(0))
            .unwrap();
        assert_eq!(head, 11);
        let tail_index: i64 = conn
            .query_row("SELECT queue_index FROM QueuedEntries WHERE entry_id = 10", [], |r| r.get(0))
            .unwrap();
        assert_eq!(tail_index, 1);
    }

    #[tokio::test]
    async fn remove_playlist_entry_drops_the_row() {
        let store = seeded_store().await;
        store.remove_playlist_entry(TrackDescription::new(1, 10)).await.unwrap();
        let count = store.get_playlist_entries_count(1).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn set_track_rating_rejects_unknown_track() {
        let store = seeded_store().await;
        let err = store
            .set_track_rating(TrackDescription::new(1, 999), 5)
            .await
            .unwrap_err();
        assert_eq!(err.code(), 21);
    }

    #[tokio::test]
    async fn recompute_crc32_persists_to_playlists_row() {
        let store = seeded_store().await;
        let crc = store.recompute_playlist_crc32(1).await.unwrap();
        let playlists = store.get_playlists().await.unwrap();
        assert_eq!(playlists[0].crc32, crc);
    }
}
