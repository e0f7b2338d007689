//! Query methods: wires `GetPlaylists`, `GetPlaylistEntries`, and the
//! single-entry/position/count variants to the store, converting typed
//! domain rows into wire `Value` objects.

use std::sync::Arc;

use aimpctl_store::{EntriesOutcome, EntryField, EntryRows, OrderDir, PlaylistField, PlaylistRow, Store};
use aimpctl_value::Value;
use async_trait::async_trait;

use crate::error::{Result, RpcError};
use crate::format;
use crate::registry::{DelayedSender, Method, MethodRegistry, Outcome};

use super::Context;

fn parse_fields<F>(params: &Value, parse: impl Fn(&str) -> Option<F>, key: &str, default: &'static [F]) -> Result<Vec<F>>
where
    F: Copy,
{
    match params.member_opt(key)? {
        None => Ok(default.to_vec()),
        Some(value) => {
            let names = value.as_array()?;
            let mut out = Vec::with_capacity(names.len());
            for name in names {
                out.push(parse(name.as_str()?).ok_or_else(|| RpcError::WrongArgument(format!("unknown field in '{key}'")))?);
            }
            Ok(out)
        }
    }
}

fn playlist_row_value(row: &PlaylistRow, fields: &[PlaylistField]) -> Result<Value> {
    let mut obj = Value::object();
    for field in fields {
        let value = match field {
            PlaylistField::Id => Value::from(row.id),
            PlaylistField::Title => Value::from(row.title.clone()),
            PlaylistField::Duration => Value::from(row.duration as i32),
            PlaylistField::EntriesCount => Value::from(row.entries_count as i32),
            PlaylistField::SizeOfEntries => Value::from(row.size_of_entries as i32),
            PlaylistField::Crc32 => Value::from(row.crc32 as i32),
        };
        obj.set_member(field.rpc_name(), value)?;
    }
    Ok(obj)
}

struct GetPlaylists(Arc<Context>);

#[async_trait]
impl Method for GetPlaylists {
    async fn invoke(&self, params: Value, _delayed: DelayedSender) -> Result<Outcome> {
        let fields = parse_fields(&params, PlaylistField::parse, "fields", PlaylistField::DEFAULT_FIELDS)?;
        let rows = self.0.store.get_playlists().await?;
        let mut arr = Value::array();
        for row in &rows {
            arr.as_array_mut()?.push(playlist_row_value(row, &fields)?);
        }
        Ok(Outcome::Immediate(arr))
    }
}

/// Reads the shared `GetPlaylistEntries`-family argument set, minus
/// `queued_mode` which each caller sets itself.
fn read_entries_spec(params: &Value) -> Result<aimpctl_store::EntriesQuerySpec> {
    let playlist_id = params.member_opt("playlist_id")?.map(Value::as_int).transpose()?;
    let format_string = params.member_opt("format_string")?.map(Value::as_str).transpose()?.map(str::to_owned);
    if format_string.is_some() && params.has_member("fields") {
        return Err(RpcError::WrongArgument("format_string and fields are mutually exclusive".into()));
    }
    let fields = if format_string.is_none() {
        parse_fields(params, EntryField::parse, "fields", EntryField::DEFAULT_FIELDS)?
    } else {
        Vec::new()
    };
    let start_index = params.member_opt("start_index")?.map(Value::as_int).transpose()?.map(i64::from);
    let entries_count = params.member_opt("entries_count")?.map(Value::as_int).transpose()?.map(i64::from);
    let search_string = params.member_opt("search_string")?.map(Value::as_str).transpose()?.map(str::to_owned);

    let mut order_fields = Vec::new();
    if let Some(raw_order) = params.member_opt("order_fields")? {
        for entry in raw_order.as_array()? {
            let field_name = entry.member("field")?.as_str()?.to_owned();
            let dir = entry.member_opt("dir")?.map(Value::as_str).transpose()?.unwrap_or("asc");
            order_fields.push((field_name, OrderDir::parse(dir)));
        }
    }

    Ok(aimpctl_store::EntriesQuerySpec {
        queued_mode: false,
        playlist_id,
        fields,
        format_string,
        start_index,
        entries_count,
        order_fields,
        search_string,
    })
}

fn resolve_playlist_id(ctx: &Context, spec: &mut aimpctl_store::EntriesQuerySpec) -> Result<()> {
    let requested = spec.playlist_id.unwrap_or(aimpctl_value::CURRENT_SENTINEL);
    if requested == aimpctl_value::CURRENT_SENTINEL {
        let now_playing = ctx.player.now_playing().ok_or(RpcError::PlaylistNotFound)?;
        spec.playlist_id = Some(now_playing.playlist_id);
    } else {
        spec.playlist_id = Some(requested);
    }
    Ok(())
}

struct GetPlaylistEntries(Arc<Context>);

#[async_trait]
impl Method for GetPlaylistEntries {
    async fn invoke(&self, params: Value, _delayed: DelayedSender) -> Result<Outcome> {
        let mut spec = read_entries_spec(&params)?;
        resolve_playlist_id(&self.0, &mut spec)?;
        let format_string = spec.format_string.clone();
        let outcome = self.0.store.get_playlist_entries(spec).await?;
        Ok(Outcome::Immediate(render_entries_outcome(outcome, format_string.as_deref())?))
    }
}

fn render_entries_outcome(outcome: EntriesOutcome, format_string: Option<&str>) -> Result<Value> {
    let mut result = Value::object();
    result.set_member("total_entries_count", Value::from(outcome.total_entries_count as i32))?;
    result.set_member("count_of_found_entries", Value::from(outcome.count_of_found_entries as i32))?;

    let mut entries = Value::array();
    {
        let rows = entries.as_array_mut()?;
        match outcome.rows {
            EntryRows::Fields(records) => {
                for record in records {
                    let mut row = Value::array();
                    let cells = row.as_array_mut()?;
                    for (_, value) in record {
                        cells.push(value);
                    }
                    rows.push(row);
                }
            }
            EntryRows::FullRecords(records) => {
                let format_string = format_string.ok_or_else(|| {
                    RpcError::Internal("full-record rows without a format string".into())
                })?;
                for record in &records {
                    rows.push(Value::String(format::render(format_string, record)?));
                }
            }
        }
    }
    result.set_member("entries", entries)?;
    Ok(result)
}

struct GetEntryPositionInDataTable(Arc<Context>);

#[async_trait]
impl Method for GetEntryPositionInDataTable {
    async fn invoke(&self, params: Value, _delayed: DelayedSender) -> Result<Outcome> {
        let mut spec = read_entries_spec(&params)?;
        resolve_playlist_id(&self.0, &mut spec)?;
        let track_id = params.member("track_id")?.as_int()?;
        let entries_per_page = spec.entries_count.unwrap_or(-1);
        let position = self.0.store.get_entry_position_in_data_table(spec, track_id).await?;

        let mut result = Value::object();
        match position {
            Some(index) if entries_per_page > 0 => {
                result.set_member("page_number", Value::from((index / entries_per_page) as i32))?;
                result.set_member("track_index_on_page", Value::from((index % entries_per_page) as i32))?;
            }
            Some(index) => {
                result.set_member("page_number", Value::from(0i32))?;
                result.set_member("track_index_on_page", Value::from(index as i32))?;
            }
            None => {
                result.set_member("page_number", Value::from(-1i32))?;
                result.set_member("track_index_on_page", Value::from(-1i32))?;
            }
        }
        Ok(Outcome::Immediate(result))
    }
}

struct GetQueuedEntries(Arc<Context>);

#[async_trait]
impl Method for GetQueuedEntries {
    async fn invoke(&self, params: Value, _delayed: DelayedSender) -> Result<Outcome> {
        let fields = parse_fields(&params, EntryField::parse, "fields", EntryField::DEFAULT_FIELDS)?;
        let outcome = self.0.store.get_queued_entries(fields).await?;
        Ok(Outcome::Immediate(render_entries_outcome(outcome, None)?))
    }
}

struct GetPlaylistEntryInfo(Arc<Context>);

#[async_trait]
impl Method for GetPlaylistEntryInfo {
    async fn invoke(&self, params: Value, _delayed: DelayedSender) -> Result<Outcome> {
        let playlist_id = params.member("playlist_id")?.as_int()?;
        let entry_id = params.member("entry_id")?.as_int()?;
        let entry = self.0.store.get_playlist_entry_info(playlist_id, entry_id).await?;

        let mut result = Value::object();
        for field in EntryField::ALL_FIELDS {
            result.set_member(field.rpc_name(), entry.field_value(*field))?;
        }
        Ok(Outcome::Immediate(result))
    }
}

struct GetPlaylistEntriesCount(Arc<Context>);

#[async_trait]
impl Method for GetPlaylistEntriesCount {
    async fn invoke(&self, params: Value, _delayed: DelayedSender) -> Result<Outcome> {
        let playlist_id = params.member("playlist_id")?.as_int()?;
        let count = self.0.store.get_playlist_entries_count(playlist_id).await?;
        Ok(Outcome::Immediate(Value::from(count as i32)))
    }
}

pub fn register_query_methods(registry: &mut MethodRegistry, ctx: Arc<Context>) {
    registry.register("GetPlaylists", Arc::new(GetPlaylists(ctx.clone())));
    registry.register("GetPlaylistEntries", Arc::new(GetPlaylistEntries(ctx.clone())));
    registry.register("GetEntryPositionInDataTable", Arc::new(GetEntryPositionInDataTable(ctx.clone())));
    registry.register("GetQueuedEntries", Arc::new(GetQueuedEntries(ctx.clone())));
    registry.register("GetPlaylistEntryInfo", Arc::new(GetPlaylistEntryInfo(ctx.clone())));
    registry.register("GetPlaylistEntriesCount", Arc::new(GetPlaylistEntriesCount(ctx)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::tests::StubBackend;
    use crate::rating::RatingWriter;
    use crate::scheduler::Scheduler;
    use tempfile::tempdir;
    use tokio::sync::oneshot;

    async fn seeded_context() -> Arc<Context> {
        let store = Store::open_in_memory().unwrap();
        store
            .get_playlists()
            .await
            .ok();
        Arc::new(Context {
            store: Arc::new(store),
            player: Arc::new(StubBackend::default()),
            scheduler: Arc::new(Scheduler::new()),
            rating: Arc::new(RatingWriter::new(tempdir().unwrap().into_path().join("ratings.txt"))),
            enable_physical_track_deletion: false,
            enable_scheduler: true,
        })
    }

    async fn invoke(method: &dyn Method, params: Value) -> Result<Outcome> {
        let (tx, _rx) = oneshot::channel();
        method.invoke(params, DelayedSender::new(tx)).await
    }

    #[tokio::test]
    async fn get_playlists_on_empty_store_returns_empty_array() {
        let ctx = seeded_context().await;
        let outcome = invoke(&GetPlaylists(ctx), Value::object()).await.unwrap();
        match outcome {
            Outcome::Immediate(arr) => assert_eq!(arr.len().unwrap(), 0),
            _ => panic!("expected immediate"),
        }
    }

    #[tokio::test]
    async fn mutually_exclusive_fields_and_format_string_is_rejected() {
        let ctx = seeded_context().await;
        let mut params = Value::object();
        params.set_member("format_string", Value::String("%T".into())).unwrap();
        params.set_member("fields", Value::array()).unwrap();
        let err = invoke(&GetPlaylistEntries(ctx), params).await.unwrap_err();
        assert_eq!(err.code(), 11);
    }

    #[tokio::test]
    async fn entries_on_empty_playlist_are_empty() {
        let ctx = seeded_context().await;
        let mut params = Value::object();
        params.set_member("playlist_id", Value::Int(1)).unwrap();
        let outcome = invoke(&GetPlaylistEntries(ctx), params).await.unwrap();
        match outcome {
            Outcome::Immediate(result) => {
                assert_eq!(result.member("total_entries_count").unwrap(), &Value::Int(0));
                assert_eq!(result.member("entries").unwrap().len().unwrap(), 0);
            }
            _ => panic!("expected immediate"),
        }
    }
}
