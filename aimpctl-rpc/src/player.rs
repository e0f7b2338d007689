//! The player backend seam. Actual AIMP/player integration is out of scope;
//! every control method, the scheduler, and the rating fallback talk to this
//! trait instead, mirroring how `aimpctl_covers::CoverSource` abstracts the
//! cover pipeline.

use aimpctl_value::TrackDescription;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

impl PlaybackState {
    pub fn wire_name(&self) -> &'static str {
        match self {
            PlaybackState::Stopped => "stopped",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
        }
    }
}

/// The fixed numeric-keyed catalog of player knobs exposed through `Status`.
/// Window-handle knobs are deliberately absent: they are blacklisted from
/// the remote surface rather than merely unimplemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKnob {
    Volume,
    Speed,
    Mute,
    Reverb,
    Balance,
    Equalizer,
    EqualizerBand(u8),
    PlayOrder,
    TrackRepeat,
    PlayingMode,
    RadioCapture,
    StereoMode,
}

impl StatusKnob {
    /// Maps a `Status` knob id to a knob. Ids outside this table include
    /// the window-handle knobs the remote surface blacklists, so they
    /// resolve to `None` rather than a variant.
    pub fn from_id(id: i32) -> Option<StatusKnob> {
        Some(match id {
            1 => StatusKnob::Volume,
            2 => StatusKnob::Balance,
            3 => StatusKnob::Speed,
            5 => StatusKnob::Mute,
            6 => StatusKnob::Reverb,
            9 => StatusKnob::StereoMode,
            10 => StatusKnob::Equalizer,
            11 => StatusKnob::TrackRepeat,
            19 => StatusKnob::PlayOrder,
            20 => StatusKnob::PlayingMode,
            43 => StatusKnob::RadioCapture,
            id @ 100..=117 => StatusKnob::EqualizerBand((id - 100) as u8),
            _ => return None,
        })
    }

    pub fn id(&self) -> i32 {
        match self {
            StatusKnob::Volume => 1,
            StatusKnob::Balance => 2,
            StatusKnob::Speed => 3,
            StatusKnob::Mute => 5,
            StatusKnob::Reverb => 6,
            StatusKnob::StereoMode => 9,
            StatusKnob::Equalizer => 10,
            StatusKnob::TrackRepeat => 11,
            StatusKnob::PlayOrder => 19,
            StatusKnob::PlayingMode => 20,
            StatusKnob::RadioCapture => 43,
            StatusKnob::EqualizerBand(band) => 100 + *band as i32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPanelSnapshot {
    pub playback_state: PlaybackState,
    pub track_position: Option<i64>,
    pub track_length: Option<i64>,
    pub playlist_id: i32,
    pub track_id: i32,
    pub volume: i32,
    pub mute_mode_on: bool,
    pub repeat_mode_on: bool,
    pub shuffle_mode_on: bool,
    pub radio_capture_mode_on: bool,
    pub current_track_source_radio: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerAction {
    StopPlayback,
    PausePlayback,
    MachineShutdown,
    MachineSleep,
    MachineHibernate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerCapabilities {
    pub shutdown: bool,
    pub sleep: bool,
    pub hibernate: bool,
}

impl SchedulerCapabilities {
    pub fn supports(&self, action: SchedulerAction) -> bool {
        match action {
            SchedulerAction::StopPlayback | SchedulerAction::PausePlayback => true,
            SchedulerAction::MachineShutdown => self.shutdown,
            SchedulerAction::MachineSleep => self.sleep,
            SchedulerAction::MachineHibernate => self.hibernate,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("playback failed")]
    PlaybackFailed,
    #[error("status knob could not be set")]
    StatusSetFailed,
    #[error("add url failed")]
    AddUrlFailed,
    #[error("rating could not be set")]
    RatingSetFailed,
}

/// Everything a control method, the scheduler, or the rating fallback needs
/// from the running player. Implementations own the real integration; tests
/// use an in-memory double.
pub trait PlayerBackend: Send + Sync {
    fn now_playing(&self) -> Option<TrackDescription>;

    fn play(&self, track: Option<TrackDescription>) -> Result<(), PlayerError>;
    fn pause(&self) -> Result<(), PlayerError>;
    fn stop(&self) -> Result<(), PlayerError>;
    fn play_previous(&self) -> Result<(), PlayerError>;
    fn play_next(&self) -> Result<(), PlayerError>;

    fn get_status(&self, knob: StatusKnob) -> Result<i32, PlayerError>;
    fn set_status(&self, knob: StatusKnob, value: i32) -> Result<(), PlayerError>;

    fn control_panel_snapshot(&self) -> ControlPanelSnapshot;

    fn add_url_to_playlist(&self, playlist_id: i32, url: &str) -> Result<(), PlayerError>;

    fn version(&self) -> String;
    fn plugin_capabilities(&self) -> Vec<String>;

    fn scheduler_capabilities(&self) -> SchedulerCapabilities;
    fn execute_scheduler_action(&self, action: SchedulerAction) -> Result<(), PlayerError>;

    /// `Some(Ok(()))` when the backend wrote the rating natively; `None`
    /// when native rating writes are unsupported and the caller should fall
    /// back to the text-file ledger.
    fn set_native_rating(&self, track: TrackDescription, rating: i32) -> Option<Result<(), PlayerError>>;

    fn supported_upload_extensions(&self) -> Vec<String>;
}

#[cfg(any(test, feature = "test-util"))]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// A minimal in-memory double exercising the `PlayerBackend` contract,
    /// shared by the scheduler, rating, and control-method test suites.
    pub struct StubBackend {
        pub now_playing: Option<TrackDescription>,
        pub volume: Mutex<i32>,
        pub mute: Mutex<bool>,
        pub shuffle: Mutex<bool>,
        pub repeat: Mutex<bool>,
        pub radio_capture: Mutex<bool>,
        pub stopped: Mutex<bool>,
        pub paused: Mutex<bool>,
        pub native_rating_supported: bool,
        pub last_rating: Mutex<Option<(TrackDescription, i32)>>,
        pub capabilities: SchedulerCapabilities,
    }

    impl Default for StubBackend {
        fn default() -> Self {
            Self {
                now_playing: Some(TrackDescription::new(1, 2)),
                volume: Mutex::new(50),
                mute: Mutex::new(false),
                shuffle: Mutex::new(false),
                repeat: Mutex::new(false),
                radio_capture: Mutex::new(false),
                stopped: Mutex::new(false),
                paused: Mutex::new(false),
                native_rating_supported: false,
                last_rating: Mutex::new(None),
                capabilities: SchedulerCapabilities { shutdown: true, sleep: false, hibernate: false },
            }
        }
    }

    impl PlayerBackend for StubBackend {
        fn now_playing(&self) -> Option<TrackDescription> {
            self.now_playing
        }

        fn play(&self, _track: Option<TrackDescription>) -> Result<(), PlayerError> {
            *self.stopped.lock().unwrap() = false;
            *self.paused.lock().unwrap() = false;
            Ok(())
        }

        fn pause(&self) -> Result<(), PlayerError> {
            *self.paused.lock().unwrap() = true;
            Ok(())
        }

        fn stop(&self) -> Result<(), PlayerError> {
            *self.stopped.lock().unwrap() = true;
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
            ControlPanelSnapshot {
                playback_state: if *self.stopped.lock().unwrap() {
                    PlaybackState::Stopped
                } else if *self.paused.lock().unwrap() {
                    PlaybackState::Paused
                } else {
                    PlaybackState::Playing
                },
                track_position: Some(0),
                track_length: Some(0),
                playlist_id: self.now_playing.map_or(0, |t| t.playlist_id),
                track_id: self.now_playing.map_or(0, |t| t.track_id),
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
            "4.70".into()
        }

        fn plugin_capabilities(&self) -> Vec<String> {
            vec!["remote_control".into()]
        }

        fn scheduler_capabilities(&self) -> SchedulerCapabilities {
            self.capabilities
        }

        fn execute_scheduler_action(&self, action: SchedulerAction) -> Result<(), PlayerError> {
            match action {
                SchedulerAction::StopPlayback => self.stop(),
                SchedulerAction::PausePlayback => self.pause(),
                _ => Ok(()),
            }
        }

        fn set_native_rating(&self, track: TrackDescription, rating: i32) -> Option<Result<(), PlayerError>> {
            if self.native_rating_supported {
                *self.last_rating.lock().unwrap() = Some((track, rating));
                Some(Ok(()))
            } else {
                None
            }
        }

        fn supported_upload_extensions(&self) -> Vec<String> {
            vec!["mp3".into(), "flac".into()]
        }
    }
}
