//! Control methods: playback transport, the `Status` knob catalog and its
//! boolean conveniences, queue management, rating, and the handful of
//! methods that don't fit any other family.

use std::sync::Arc;
use std::time::Duration;

use aimpctl_value::{TrackDescription, Value};
use async_trait::async_trait;

use crate::error::{Result, RpcError};
use crate::format;
use crate::player::{PlaybackState, SchedulerAction, StatusKnob};
use crate::registry::{DelayedSender, Method, MethodRegistry, Outcome};
use crate::scheduler::Expiration;

use super::Context;

/// Reads `playlist_id`/`track_id` (defaulting both to the `-1` sentinel)
/// and resolves them against the backend's current playback. Callers map
/// the `NothingPlayingError` to whichever fault code fits their operation.
fn read_track_desc(params: &Value) -> Result<TrackDescription> {
    let playlist_id = params.member_opt("playlist_id")?.map(Value::as_int).transpose()?.unwrap_or(-1);
    let track_id = params.member_opt("track_id")?.map(Value::as_int).transpose()?.unwrap_or(-1);
    Ok(TrackDescription::new(playlist_id, track_id))
}

fn resolve_track(ctx: &Context, params: &Value) -> Result<TrackDescription> {
    read_track_desc(params)?.resolve(ctx.player.now_playing()).map_err(|_| RpcError::TrackNotFound)
}

struct Play(Arc<Context>);

#[async_trait]
impl Method for Play {
    async fn invoke(&self, params: Value, _delayed: DelayedSender) -> Result<Outcome> {
        let track = if params.has_member("track_id") || params.has_member("playlist_id") {
            let desc = read_track_desc(&params)?
                .resolve(self.0.player.now_playing())
                .map_err(|_| RpcError::PlaybackFailed)?;
            Some(desc)
        } else {
            None
        };
        self.0.player.play(track).map_err(|_| RpcError::PlaybackFailed)?;
        let snapshot = self.0.player.control_panel_snapshot();
        let mut result = Value::object();
        result.set_member("playback_state", Value::String(snapshot.playback_state.wire_name().into()))?;
        result.set_member("playlist_id", Value::from(snapshot.playlist_id))?;
        result.set_member("track_id", Value::from(snapshot.track_id))?;
        Ok(Outcome::Immediate(result))
    }
}

macro_rules! simple_transport_method {
    ($name:ident, $call:ident, $err:expr) => {
        struct $name(Arc<Context>);

        #[async_trait]
        impl Method for $name {
            async fn invoke(&self, _params: Value, _delayed: DelayedSender) -> Result<Outcome> {
                self.0.player.$call().map_err(|_| $err)?;
                Ok(Outcome::Immediate(Value::Null))
            }
        }
    };
}

simple_transport_method!(Pause, pause, RpcError::PlaybackFailed);
simple_transport_method!(Stop, stop, RpcError::PlaybackFailed);
simple_transport_method!(PlayPrevious, play_previous, RpcError::PlaybackFailed);
simple_transport_method!(PlayNext, play_next, RpcError::PlaybackFailed);

struct StatusMethod(Arc<Context>);

#[async_trait]
impl Method for StatusMethod {
    async fn invoke(&self, params: Value, _delayed: DelayedSender) -> Result<Outcome> {
        let id = params.member("id")?.as_int()?;
        let knob = StatusKnob::from_id(id).ok_or_else(|| RpcError::WrongArgument(format!("unknown status id {id}")))?;

        if let Some(value) = params.member_opt("value")? {
            let value = value.as_int()?;
            self.0.player.set_status(knob, value).map_err(|_| RpcError::StatusSetFailed)?;
        }

        let value = self.0.player.get_status(knob).map_err(|_| RpcError::StatusSetFailed)?;
        let mut result = Value::object();
        result.set_member("id", Value::from(id))?;
        result.set_member("value", Value::from(value))?;
        Ok(Outcome::Immediate(result))
    }
}

struct VolumeLevel(Arc<Context>);

#[async_trait]
impl Method for VolumeLevel {
    async fn invoke(&self, params: Value, _delayed: DelayedSender) -> Result<Outcome> {
        let level = params.member("level")?.as_int()?;
        if !(0..=100).contains(&level) {
            return Err(RpcError::VolumeOutOfRange);
        }
        self.0.player.set_status(StatusKnob::Volume, level).map_err(|_| RpcError::VolumeSetFailed)?;
        let mut result = Value::object();
        result.set_member("volume", Value::from(level))?;
        Ok(Outcome::Immediate(result))
    }
}

macro_rules! bool_knob_method {
    ($name:ident, $knob:expr, $err:expr, $key:literal) => {
        struct $name(Arc<Context>);

        #[async_trait]
        impl Method for $name {
            async fn invoke(&self, params: Value, _delayed: DelayedSender) -> Result<Outcome> {
                if let Some(value) = params.member_opt($key)? {
                    let on = value.as_bool()?;
                    self.0.player.set_status($knob, on as i32).map_err(|_| $err)?;
                }
                let on = self.0.player.get_status($knob).map_err(|_| $err)? != 0;
                let mut result = Value::object();
                result.set_member($key, Value::Bool(on))?;
                Ok(Outcome::Immediate(result))
            }
        }
    };
}

bool_knob_method!(Mute, StatusKnob::Mute, RpcError::MuteFailed, "mute");
bool_knob_method!(Shuffle, StatusKnob::PlayOrder, RpcError::ShuffleFailed, "shuffle");
bool_knob_method!(Repeat, StatusKnob::TrackRepeat, RpcError::RepeatFailed, "repeat");
bool_knob_method!(RadioCaptureMode, StatusKnob::RadioCapture, RpcError::RadioCaptureFailed, "radio_capture_mode");

struct EnqueueTrack(Arc<Context>);

#[async_trait]
impl Method for EnqueueTrack {
    async fn invoke(&self, params: Value, _delayed: DelayedSender) -> Result<Outcome> {
        let track = resolve_track(&self.0, &params)?;
        let insert_at_beginning = params
            .member_opt("insert_at_queue_beginning")?
            .map(Value::as_bool)
            .transpose()?
            .unwrap_or(false);
        self.0.store.enqueue_track(track, insert_at_beginning).await.map_err(|_| RpcError::EnqueueFailed)?;
        Ok(Outcome::Immediate(Value::Null))
    }
}

struct RemoveTrackFromPlayQueue(Arc<Context>);

#[async_trait]
impl Method for RemoveTrackFromPlayQueue {
    async fn invoke(&self, params: Value, _delayed: DelayedSender) -> Result<Outcome> {
        let track = resolve_track(&self.0, &params)?;
        self.0.store.remove_track_from_queue(track).await.map_err(|_| RpcError::DequeueFailed)?;
        Ok(Outcome::Immediate(Value::Null))
    }
}

struct QueueTrackMove(Arc<Context>);

#[async_trait]
impl Method for QueueTrackMove {
    async fn invoke(&self, params: Value, _delayed: DelayedSender) -> Result<Outcome> {
        let new_index = params.member("new_queue_index")?.as_int()? as i64;
        if params.has_member("track_id") || params.has_member("playlist_id") {
            let track = resolve_track(&self.0, &params)?;
            self.0.store.queue_track_move(track, new_index).await.map_err(|_| RpcError::MoveInQueueFailed)?;
        } else if let Some(old_index) = params.member_opt("old_queue_index")?.map(Value::as_int).transpose()? {
            self.0
                .store
                .queue_track_move_by_index(old_index as i64, new_index)
                .await
                .map_err(|_| RpcError::MoveInQueueFailed)?;
        } else {
            return Err(RpcError::WrongArgument(
                "QueueTrackMove needs either a track descriptor or old_queue_index".into(),
            ));
        }
        Ok(Outcome::Immediate(Value::Null))
    }
}

struct GetFormattedEntryTitle(Arc<Context>);

#[async_trait]
impl Method for GetFormattedEntryTitle {
    async fn invoke(&self, params: Value, _delayed: DelayedSender) -> Result<Outcome> {
        let track = resolve_track(&self.0, &params)?;
        let fmt = params.member("format_string")?.as_str()?.to_owned();
        let entry = self.0.store.get_playlist_entry_info(track.playlist_id, track.track_id).await?;
        let rendered = format::render(&fmt, &entry)?;
        Ok(Outcome::Immediate(Value::String(rendered)))
    }
}

struct GetPlayerControlPanelState(Arc<Context>);

#[async_trait]
impl Method for GetPlayerControlPanelState {
    async fn invoke(&self, _params: Value, _delayed: DelayedSender) -> Result<Outcome> {
        Ok(Outcome::Immediate(control_panel_snapshot_value(&self.0)))
    }
}

pub(crate) fn control_panel_snapshot_value(ctx: &Context) -> Value {
    let snapshot = ctx.player.control_panel_snapshot();
    let mut result = Value::object();
    let _ = result.set_member("playback_state", Value::String(snapshot.playback_state.wire_name().into()));
    if snapshot.playback_state != PlaybackState::Stopped {
        if let Some(position) = snapshot.track_position {
            let _ = result.set_member("track_position", Value::from(position as i32));
        }
        if let Some(length) = snapshot.track_length {
            let _ = result.set_member("track_length", Value::from(length as i32));
        }
    }
    let _ = result.set_member("playlist_id", Value::from(snapshot.playlist_id));
    let _ = result.set_member("track_id", Value::from(snapshot.track_id));
    let _ = result.set_member("volume", Value::from(snapshot.volume));
    let _ = result.set_member("mute_mode_on", Value::Bool(snapshot.mute_mode_on));
    let _ = result.set_member("repeat_mode_on", Value::Bool(snapshot.repeat_mode_on));
    let _ = result.set_member("shuffle_mode_on", Value::Bool(snapshot.shuffle_mode_on));
    let _ = result.set_member("radio_capture_mode_on", Value::Bool(snapshot.radio_capture_mode_on));
    if let Some(radio) = snapshot.current_track_source_radio {
        let _ = result.set_member("current_track_source_radio", Value::Bool(radio));
    }
    result
}

struct SetTrackRating(Arc<Context>);

#[async_trait]
impl Method for SetTrackRating {
    async fn invoke(&self, params: Value, _delayed: DelayedSender) -> Result<Outcome> {
        let track = resolve_track(&self.0, &params)?;
        let rating = params.member("rating")?.as_int()?;
        let entry = self.0.store.get_playlist_entry_info(track.playlist_id, track.track_id).await?;
        self.0
            .rating
            .set_rating(self.0.player.as_ref(), track, &entry.filename, rating)
            .map_err(|_| RpcError::RatingSetFailed)?;
        self.0.store.set_track_rating(track, rating.clamp(0, 5)).await?;
        Ok(Outcome::Immediate(Value::Null))
    }
}

struct RemoveTrack(Arc<Context>);

#[async_trait]
impl Method for RemoveTrack {
    async fn invoke(&self, params: Value, _delayed: DelayedSender) -> Result<Outcome> {
        let track = resolve_track(&self.0, &params)?;
        let physically = params.member_opt("physically")?.map(Value::as_bool).transpose()?.unwrap_or(false);
        if physically && !self.0.enable_physical_track_deletion {
            return Err(RpcError::RemoveTrackDisabled);
        }

        if physically {
            let entry = self.0.store.get_playlist_entry_info(track.playlist_id, track.track_id).await?;
            if let Err(e) = std::fs::remove_file(&entry.filename) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    return Err(RpcError::RemoveTrackFailed);
                }
            }
        }

        self.0.store.remove_playlist_entry(track).await.map_err(|_| RpcError::RemoveTrackFailed)?;
        Ok(Outcome::Immediate(Value::Null))
    }
}

struct AddUrlToPlaylist(Arc<Context>);

#[async_trait]
impl Method for AddUrlToPlaylist {
    async fn invoke(&self, params: Value, _delayed: DelayedSender) -> Result<Outcome> {
        let playlist_id = params.member("playlist_id")?.as_int()?;
        let url = params.member("url")?.as_str()?;
        self.0.player.add_url_to_playlist(playlist_id, url).map_err(|_| RpcError::AddUrlFailed)?;
        Ok(Outcome::Immediate(Value::Null))
    }
}

struct Version(Arc<Context>);

#[async_trait]
impl Method for Version {
    async fn invoke(&self, _params: Value, _delayed: DelayedSender) -> Result<Outcome> {
        Ok(Outcome::Immediate(Value::String(self.0.player.version())))
    }
}

struct PluginCapabilities(Arc<Context>);

#[async_trait]
impl Method for PluginCapabilities {
    async fn invoke(&self, _params: Value, _delayed: DelayedSender) -> Result<Outcome> {
        let mut arr = Value::array();
        let items = arr.as_array_mut()?;
        for capability in self.0.player.plugin_capabilities() {
            items.push(Value::String(capability));
        }
        Ok(Outcome::Immediate(arr))
    }
}

struct SchedulerMethod(Arc<Context>);

#[async_trait]
impl Method for SchedulerMethod {
    async fn invoke(&self, params: Value, _delayed: DelayedSender) -> Result<Outcome> {
        if !self.0.enable_scheduler {
            return Err(RpcError::SchedulerDisabled);
        }

        if let Some(action_name) = params.member_opt("action")?.map(Value::as_str).transpose()? {
            if action_name == "cancel" {
                self.0.scheduler.cancel();
            } else {
                let action = parse_scheduler_action(action_name)?;
                let expiration = read_expiration(&params)?;
                self.0
                    .scheduler
                    .set(self.0.player.as_ref(), action, expiration)
                    .map_err(|_| RpcError::WrongArgument("scheduler action unsupported on this host".into()))?;
            }
        }

        let status = self.0.scheduler.status(self.0.player.as_ref());
        let mut result = Value::object();
        let mut caps = Value::object();
        caps.set_member("shutdown", Value::Bool(status.capabilities.shutdown))?;
        caps.set_member("sleep", Value::Bool(status.capabilities.sleep))?;
        caps.set_member("hibernate", Value::Bool(status.capabilities.hibernate))?;
        result.set_member("capabilities", caps)?;
        if let Some((action, _deadline)) = status.armed {
            result.set_member("armed_action", Value::String(scheduler_action_name(action).into()))?;
        }
        Ok(Outcome::Immediate(result))
    }
}

/// Reads the mutually-exclusive `expires_at`/`expires_delay_seconds` params.
/// `expires_at` is a Unix-epoch timestamp in seconds; `expires_delay_seconds`
/// is relative to now.
fn read_expiration(params: &Value) -> Result<Expiration> {
    let expires_at = params.member_opt("expires_at")?.map(Value::as_double).transpose()?;
    let expires_delay = params.member_opt("expires_delay_seconds")?.map(Value::as_int).transpose()?;
    match (expires_at, expires_delay) {
        (Some(_), Some(_)) => {
            Err(RpcError::WrongArgument("expires_at and expires_delay_seconds are mutually exclusive".into()))
        }
        (Some(at), None) => Ok(Expiration::At(std::time::UNIX_EPOCH + Duration::from_secs_f64(at.max(0.0)))),
        (None, Some(delay_seconds)) => {
            if delay_seconds < 0 {
                return Err(RpcError::WrongArgument("expires_delay_seconds must be non-negative".into()));
            }
            Ok(Expiration::Delay(Duration::from_secs(delay_seconds as u64)))
        }
        (None, None) => Err(RpcError::WrongArgument("Scheduler requires expires_at or expires_delay_seconds".into())),
    }
}

fn parse_scheduler_action(name: &str) -> Result<SchedulerAction> {
    Ok(match name {
        "stop_playback" => SchedulerAction::StopPlayback,
        "pause_playback" => SchedulerAction::PausePlayback,
        "machine_shutdown" => SchedulerAction::MachineShutdown,
        "machine_sleep" => SchedulerAction::MachineSleep,
        "machine_hibernate" => SchedulerAction::MachineHibernate,
        other => return Err(RpcError::WrongArgument(format!("unknown scheduler action '{other}'"))),
    })
}

fn scheduler_action_name(action: SchedulerAction) -> &'static str {
    match action {
        SchedulerAction::StopPlayback => "stop_playback",
        SchedulerAction::PausePlayback => "pause_playback",
        SchedulerAction::MachineShutdown => "machine_shutdown",
        SchedulerAction::MachineSleep => "machine_sleep",
        SchedulerAction::MachineHibernate => "machine_hibernate",
    }
}

pub fn register_control_methods(registry: &mut MethodRegistry, ctx: Arc<Context>) {
    registry.register("Play", Arc::new(Play(ctx.clone())));
    registry.register("Pause", Arc::new(Pause(ctx.clone())));
    registry.register("Stop", Arc::new(Stop(ctx.clone())));
    registry.register("PlayPrevious", Arc::new(PlayPrevious(ctx.clone())));
    registry.register("PlayNext", Arc::new(PlayNext(ctx.clone())));
    registry.register("Status", Arc::new(StatusMethod(ctx.clone())));
    registry.register("VolumeLevel", Arc::new(VolumeLevel(ctx.clone())));
    registry.register("Mute", Arc::new(Mute(ctx.clone())));
    registry.register("Shuffle", Arc::new(Shuffle(ctx.clone())));
    registry.register("Repeat", Arc::new(Repeat(ctx.clone())));
    registry.register("RadioCaptureMode", Arc::new(RadioCaptureMode(ctx.clone())));
    registry.register("EnqueueTrack", Arc::new(EnqueueTrack(ctx.clone())));
    registry.register("RemoveTrackFromPlayQueue", Arc::new(RemoveTrackFromPlayQueue(ctx.clone())));
    registry.register("QueueTrackMove", Arc::new(QueueTrackMove(ctx.clone())));
    registry.register("RemoveTrack", Arc::new(RemoveTrack(ctx.clone())));
    registry.register("GetFormattedEntryTitle", Arc::new(GetFormattedEntryTitle(ctx.clone())));
    registry.register("GetPlayerControlPanelState", Arc::new(GetPlayerControlPanelState(ctx.clone())));
    registry.register("SetTrackRating", Arc::new(SetTrackRating(ctx.clone())));
    registry.register("AddURLToPlaylist", Arc::new(AddUrlToPlaylist(ctx.clone())));
    registry.register("Version", Arc::new(Version(ctx.clone())));
    registry.register("PluginCapabilities", Arc::new(PluginCapabilities(ctx.clone())));
    registry.register("Scheduler", Arc::new(SchedulerMethod(ctx)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::tests::StubBackend;
    use crate::rating::RatingWriter;
    use crate::scheduler::Scheduler;
    use aimpctl_store::Store;
    use tempfile::tempdir;
    use tokio::sync::oneshot;

    fn context() -> Arc<Context> {
        Arc::new(Context {
            store: Arc::new(Store::open_in_memory().unwrap()),
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
    async fn volume_level_out_of_range_is_rejected() {
        let ctx = context();
        let mut params = Value::object();
        params.set_member("level", Value::Int(250)).unwrap();
        let err = invoke(&VolumeLevel(ctx), params).await.unwrap_err();
        assert_eq!(err.code(), 15);
    }

    #[tokio::test]
    async fn volume_level_in_range_reports_back_the_new_volume() {
        let ctx = context();
        let mut params = Value::object();
        params.set_member("level", Value::Int(50)).unwrap();
        let outcome = invoke(&VolumeLevel(ctx), params).await.unwrap();
        match outcome {
            Outcome::Immediate(result) => {
                assert_eq!(result.member("volume").unwrap(), &Value::Int(50));
            }
            _ => panic!("expected immediate outcome"),
        }
    }

    #[tokio::test]
    async fn unknown_status_id_is_a_wrong_argument_error() {
        let ctx = context();
        let mut params = Value::object();
        params.set_member("id", Value::Int(21)).unwrap();
        let err = invoke(&StatusMethod(ctx), params).await.unwrap_err();
        assert_eq!(err.code(), 11);
    }

    #[tokio::test]
    async fn scheduler_cancel_is_a_no_op_when_nothing_armed() {
        let ctx = context();
        let mut params = Value::object();
        params.set_member("action", Value::String("cancel".into())).unwrap();
        let outcome = invoke(&SchedulerMethod(ctx), params).await.unwrap();
        assert!(matches!(outcome, Outcome::Immediate(_)));
    }

    #[tokio::test]
    async fn physical_removal_is_rejected_when_config_disables_it() {
        let ctx = context();
        ctx.store.enqueue_track(TrackDescription::new(1, 1), false).await.ok();
        let mut params = Value::object();
        params.set_member("playlist_id", Value::Int(1)).unwrap();
        params.set_member("track_id", Value::Int(1)).unwrap();
        params.set_member("physically", Value::Bool(true)).unwrap();
        let err = invoke(&RemoveTrack(ctx), params).await.unwrap_err();
        assert_eq!(err.code(), 29);
    }

    #[tokio::test]
    async fn scheduler_rejects_unsupported_action() {
        let ctx = context();
        let mut params = Value::object();
        params.set_member("action", Value::String("machine_hibernate".into())).unwrap();
        params.set_member("expires_delay_seconds", Value::Int(5)).unwrap();
        let err = invoke(&SchedulerMethod(ctx), params).await.unwrap_err();
        assert_eq!(err.code(), 11);
    }

    #[tokio::test]
    async fn scheduler_is_rejected_when_disabled() {
        let ctx = Arc::new(Context {
            store: Arc::new(Store::open_in_memory().unwrap()),
            player: Arc::new(StubBackend::default()),
            scheduler: Arc::new(Scheduler::new()),
            rating: Arc::new(RatingWriter::new(tempdir().unwrap().into_path().join("ratings.txt"))),
            enable_physical_track_deletion: false,
            enable_scheduler: false,
        });
        let mut params = Value::object();
        params.set_member("action", Value::String("cancel".into())).unwrap();
        let err = invoke(&SchedulerMethod(ctx), params).await.unwrap_err();
        assert_eq!(err.code(), 30);
    }

    #[tokio::test]
    async fn scheduler_accepts_an_absolute_expires_at() {
        let ctx = context();
        let mut params = Value::object();
        params.set_member("action", Value::String("stop_playback".into())).unwrap();
        let at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs_f64()
            + 60.0;
        params.set_member("expires_at", Value::Double(at)).unwrap();
        let outcome = invoke(&SchedulerMethod(ctx), params).await.unwrap();
        match outcome {
            Outcome::Immediate(result) => {
                assert_eq!(result.member("armed_action").unwrap(), &Value::String("stop_playback".into()));
            }
            _ => panic!("expected immediate outcome"),
        }
    }

    #[tokio::test]
    async fn scheduler_rejects_both_expires_at_and_expires_delay() {
        let ctx = context();
        let mut params = Value::object();
        params.set_member("action", Value::String("stop_playback".into())).unwrap();
        params.set_member("expires_at", Value::Double(1.0)).unwrap();
        params.set_member("expires_delay_seconds", Value::Int(5)).unwrap();
        let err = invoke(&SchedulerMethod(ctx), params).await.unwrap_err();
        assert_eq!(err.code(), 11);
    }

    #[tokio::test]
    async fn queue_track_move_by_old_queue_index() {
        let ctx = context();
        ctx.store.enqueue_track(TrackDescription::new(1, 10), false).await.unwrap();
        ctx.store.enqueue_track(TrackDescription::new(1, 11), false).await.unwrap();
        let mut params = Value::object();
        params.set_member("old_queue_index", Value::Int(0)).unwrap();
        params.set_member("new_queue_index", Value::Int(1)).unwrap();
        let outcome = invoke(&QueueTrackMove(ctx), params).await.unwrap();
        assert!(matches!(outcome, Outcome::Immediate(_)));
    }

    #[tokio::test]
    async fn queue_track_move_without_descriptor_or_index_is_a_wrong_argument_error() {
        let ctx = context();
        let mut params = Value::object();
        params.set_member("new_queue_index", Value::Int(1)).unwrap();
        let err = invoke(&QueueTrackMove(ctx), params).await.unwrap_err();
        assert_eq!(err.code(), 11);
    }
}
