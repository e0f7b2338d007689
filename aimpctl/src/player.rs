//! A minimal in-process player backend. Real AIMP/player-engine bindings are
//! out of scope; this implementation tracks playback state purely in memory
//! so the HTTP surface has something to answer through while a real
//! integration is plugged in behind the same [`PlayerBackend`] trait.

use std::path::PathBuf;
use std::sync::Mutex;

use aimpctl_covers::{CoverContainer, CoverSource};
use aimpctl_rpc::broker::EventPayloads;
use aimpctl_rpc::player::{
    ControlPanelSnapshot, PlaybackState, PlayerBackend, PlayerError, SchedulerAction, SchedulerCapabilities, StatusKnob,
};
use aimpctl_value::{TrackDescription, Value};

pub struct InProcessPlayer {
    now_playing: Mutex<Option<TrackDescription>>,
    volume: Mutex<i32>,
    mute: Mutex<bool>,
    shuffle: Mutex<bool>,
    repeat: Mutex<bool>,
    radio_capture: Mutex<bool>,
    state: Mutex<PlaybackState>,
}

impl Default for InProcessPlayer {
    fn default() -> Self {
        Self {
            now_playing: Mutex::new(None),
            volume: Mutex::new(50),
            mute: Mutex::new(false),
            shuffle: Mutex::new(false),
            repeat: Mutex::new(false),
            radio_capture: Mutex::new(false),
            state: Mutex::new(PlaybackState::Stopped),
        }
    }
}

impl PlayerBackend for InProcessPlayer {
    fn now_playing(&self) -> Option<TrackDescription> {
        *self.now_playing.lock().unwrap()
    }

    fn play(&self, track: Option<TrackDescription>) -> Result<(), PlayerError> {
        if let Some(track) = track {
            *self.now_playing.lock().unwrap() = Some(track);
        }
        *self.state.lock().unwrap() = PlaybackState::Playing;
        Ok(())
    }

    fn pause(&self) -> Result<(), PlayerError> {
        *self.state.lock().unwrap() = PlaybackState::Paused;
        Ok(())
    }

    fn stop(&self) -> Result<(), PlayerError> {
        *self.state.lock().unwrap() = PlaybackState::Stopped;
        Ok(())
    }

    fn play_previous(&self) -> Result<(), PlayerError> {
        Ok(())
    }

    fn play_next(&self) -> Result<(), PlayerError> {
        Ok(())
    }

    fn get_status(&self, knob: StatusKnob) -> Result<i32, PlayerError> {
        Ok(match knob {
            StatusKnob::Volume => *self.volume.lock().unwrap(),
            StatusKnob::Mute => *self.mute.lock().unwrap() as i32,
            StatusKnob::PlayOrder => *self.shuffle.lock().unwrap() as i32,
            StatusKnob::TrackRepeat => *self.repeat.lock().unwrap() as i32,
            StatusKnob::RadioCapture => *self.radio_capture.lock().unwrap() as i32,
            _ => 0,
        })
    }

    fn set_status(&self, knob: StatusKnob, value: i32) -> Result<(), PlayerError> {
        match knob {
            StatusKnob::Volume => *self.volume.lock().unwrap() = value,
            StatusKnob::Mute => *self.mute.lock().unwrap() = value != 0,
            StatusKnob::PlayOrder => *self.shuffle.lock().unwrap() = value != 0,
            StatusKnob::TrackRepeat => *self.repeat.lock().unwrap() = value != 0,
            StatusKnob::RadioCapture => *self.radio_capture.lock().unwrap() = value != 0,
            _ => return Err(PlayerError::StatusSetFailed),
        }
        Ok(())
    }

    fn control_panel_snapshot(&self) -> ControlPanelSnapshot {
        let now_playing = *self.now_playing.lock().unwrap();
        ControlPanelSnapshot {
            playback_state: *self.state.lock().unwrap(),
            track_position: Some(0),
            track_length: Some(0),
            playlist_id: now_playing.map_or(0, |t| t.playlist_id),
            track_id: now_playing.map_or(0, |t| t.track_id),
            volume: *self.volume.lock().unwrap(),
            mute_mode_on: *self.mute.lock().unwrap(),
            repeat_mode_on: *self.repeat.lock().unwrap(),
            shuffle_mode_on: *self.shuffle.lock().unwrap(),
            radio_capture_mode_on: *self.radio_capture.lock().unwrap(),
            current_track_source_radio: None,
        }
    }

    fn add_url_to_playlist(&self, _playlist_id: i32, _url: &str) -> Result<(), PlayerError> {
        Ok(())
    }

    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_owned()
    }

    fn plugin_capabilities(&self) -> Vec<String> {
        vec!["remote_control".into()]
    }

    fn scheduler_capabilities(&self) -> SchedulerCapabilities {
        SchedulerCapabilities { shutdown: false, sleep: false, hibernate: false }
    }

    fn execute_scheduler_action(&self, action: SchedulerAction) -> Result<(), PlayerError> {
        match action {
            SchedulerAction::StopPlayback => self.stop(),
            SchedulerAction::PausePlayback => self.pause(),
            _ => Err(PlayerError::PlaybackFailed),
        }
    }

    fn set_native_rating(&self, _track: TrackDescription, _rating: i32) -> Option<Result<(), PlayerError>> {
        None
    }

    fn supported_upload_extensions(&self) -> Vec<String> {
        vec!["mp3".into(), "flac".into(), "ogg".into(), "wav".into(), "m4a".into()]
    }
}

/// No real player engine means no access to cover art either; every lookup
/// falls through to `NoCoverAvailable` in [`aimpctl_covers::CoverService`].
impl CoverSource for InProcessPlayer {
    fn cover_file_path(&self, _track: TrackDescription) -> Option<PathBuf> {
        None
    }

    fn cover_container(&self, _track: TrackDescription) -> Option<CoverContainer> {
        None
    }

    fn content_hash(&self, _track: TrackDescription) -> Option<u32> {
        None
    }

    fn now_playing(&self) -> Option<TrackDescription> {
        PlayerBackend::now_playing(self)
    }
}

/// A real integration would call `Broker::fire` from the player engine's own
/// event callbacks; nothing in this in-process stand-in ever does, so these
/// payloads are only ever exercised by tests constructing them directly.
impl EventPayloads for InProcessPlayer {
    fn play_state_change(&self) -> Value {
        Value::String(self.control_panel_snapshot().playback_state.wire_name().into())
    }

    fn current_track_change(&self) -> Value {
        match self.now_playing_track() {
            Some(track) => {
                let mut value = Value::object();
                let _ = value.set_member("playlist_id", Value::from(track.playlist_id));
                let _ = value.set_member("track_id", Value::from(track.track_id));
                value
            }
            None => Value::Null,
        }
    }

    fn control_panel_state_change(&self, aimp_app_is_exiting: bool) -> Value {
        let mut value = Value::object();
        let _ = value.set_member("aimp_app_is_exiting", Value::Bool(aimp_app_is_exiting));
        value
    }

    fn playlists_content_change(&self) -> Value {
        Value::Null
    }
}

impl InProcessPlayer {
    fn now_playing_track(&self) -> Option<TrackDescription> {
        PlayerBackend::now_playing(self)
    }
}
