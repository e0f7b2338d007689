//! The subscription broker: Comet-style long-poll. Handlers that receive a
//! `SubscribeOnAIMPStateUpdateEvent` call return `Outcome::Delayed` and hand
//! their delayed-sender to [`Broker::subscribe`]; a later internal player
//! event fires the matching subscriptions exactly once each.

use std::collections::HashMap;
use std::sync::Mutex;

use aimpctl_value::Value;

use crate::frontend::json_rpc::value_to_json;
use crate::registry::DelayedSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalEvent {
    PlayStateChange,
    CurrentTrackChange,
    ControlPanelStateChange,
    PlaylistsContentChange,
}

impl ExternalEvent {
    pub fn parse(name: &str) -> Option<ExternalEvent> {
        Some(match name {
            "play_state_change" => ExternalEvent::PlayStateChange,
            "current_track_change" => ExternalEvent::CurrentTrackChange,
            "control_panel_state_change" => ExternalEvent::ControlPanelStateChange,
            "playlists_content_change" => ExternalEvent::PlaylistsContentChange,
            _ => return None,
        })
    }
}

/// The internal player events the broker translates into external ones, per
/// the translation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalEvent {
    TrackPosChanged,
    PlayFile,
    PlayerState,
    /// Carries whether the reported playback is non-stopped with `length == 0`,
    /// the live-stream title-switch heuristic.
    PlaylistsContentChange { live_stream_switch: bool },
    TrackProgressChangedDirectly,
    AimpQuit,
    Volume,
    Mute,
    Shuffle,
    Repeat,
    RadioCapture,
}

impl InternalEvent {
    fn external_events(&self) -> &'static [ExternalEvent] {
        use ExternalEvent::*;
        match self {
            InternalEvent::TrackPosChanged => &[ControlPanelStateChange],
            InternalEvent::PlayFile => &[CurrentTrackChange, ControlPanelStateChange],
            InternalEvent::PlayerState => &[PlayStateChange, ControlPanelStateChange],
            InternalEvent::PlaylistsContentChange { live_stream_switch } => {
                if *live_stream_switch {
                    &[PlaylistsContentChange, CurrentTrackChange, ControlPanelStateChange]
                } else {
                    &[PlaylistsContentChange]
                }
            }
            InternalEvent::TrackProgressChangedDirectly => &[PlayStateChange],
            InternalEvent::AimpQuit => &[],
            InternalEvent::Volume
            | InternalEvent::Mute
            | InternalEvent::Shuffle
            | InternalEvent::Repeat
            | InternalEvent::RadioCapture => &[ControlPanelStateChange],
        }
    }
}

struct Subscription {
    root_request_id: Value,
    sender: DelayedSender,
}

/// Renders the payload for a fired event, given whatever the caller can
/// observe about current player state. A real integration stitches this to
/// the player backend's live snapshot.
pub trait EventPayloads: Send + Sync {
    fn play_state_change(&self) -> Value;
    fn current_track_change(&self) -> Value;
    fn control_panel_state_change(&self, aimp_app_is_exiting: bool) -> Value;
    fn playlists_content_change(&self) -> Value;
}

#[derive(Default)]
pub struct Broker {
    subscriptions: Mutex<HashMap<ExternalEvent, Vec<Subscription>>>,
    aimp_quit_latched: Mutex<bool>,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, event: ExternalEvent, root_request_id: Value, sender: DelayedSender) {
        self.subscriptions
            .lock()
            .unwrap()
            .entry(event)
            .or_default()
            .push(Subscription { root_request_id, sender });
    }

    pub fn pending_count(&self, event: ExternalEvent) -> usize {
        self.subscriptions.lock().unwrap().get(&event).map_or(0, |v| v.len())
    }

    /// Translates an internal event and fires every currently-subscribed
    /// delayed-sender for the resulting external event(s), FIFO by
    /// subscription order, then clears them.
    pub fn fire(&self, internal: InternalEvent, payloads: &dyn EventPayloads) {
        if matches!(internal, InternalEvent::AimpQuit) {
            *self.aimp_quit_latched.lock().unwrap() = true;
            return;
        }

        for external in internal.external_events() {
            let fired = {
                let mut subs = self.subscriptions.lock().unwrap();
                subs.remove(external).unwrap_or_default()
            };
            if fired.is_empty() {
                continue;
            }
            let payload = self.render_payload(*external, payloads);
            for sub in fired {
                let mut result = aimpctl_value::Value::object();
                let _ = result.set_member("id", sub.root_request_id.clone());
                let _ = result.set_member("result", payload.clone());
                sub.sender.send(result);
            }
        }
    }

    fn render_payload(&self, event: ExternalEvent, payloads: &dyn EventPayloads) -> Value {
        match event {
            ExternalEvent::PlayStateChange => payloads.play_state_change(),
            ExternalEvent::CurrentTrackChange => payloads.current_track_change(),
            ExternalEvent::ControlPanelStateChange => {
                let mut latched = self.aimp_quit_latched.lock().unwrap();
                let exiting = std::mem::take(&mut *latched);
                payloads.control_panel_state_change(exiting)
            }
            ExternalEvent::PlaylistsContentChange => payloads.playlists_content_change(),
        }
    }
}

/// Convenience: render a payload value through the JSON conversion helper
/// for transport layers that want plain JSON rather than `Value`.
pub fn payload_to_json(value: &Value) -> serde_json::Value {
    value_to_json(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    struct StubPayloads;
    impl EventPayloads for StubPayloads {
        fn play_state_change(&self) -> Value {
            Value::String("playing".into())
        }
        fn current_track_change(&self) -> Value {
            Value::Null
        }
        fn control_panel_state_change(&self, aimp_app_is_exiting: bool) -> Value {
            Value::Bool(aimp_app_is_exiting)
        }
        fn playlists_content_change(&self) -> Value {
            Value::Null
        }
    }

    #[tokio::test]
    async fn firing_play_file_delivers_to_both_translated_events() {
        let broker = Broker::new();
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        broker.subscribe(ExternalEvent::CurrentTrackChange, Value::Int(1), DelayedSender::new(tx1));
        broker.subscribe(ExternalEvent::ControlPanelStateChange, Value::Int(2), DelayedSender::new(tx2));

        broker.fire(InternalEvent::PlayFile, &StubPayloads);

        assert!(rx1.await.is_ok());
        assert!(rx2.await.is_ok());
    }

    #[tokio::test]
    async fn aimp_quit_latches_onto_the_next_control_panel_fire() {
        let broker = Broker::new();
        let (tx, rx) = oneshot::channel();
        broker.fire(InternalEvent::AimpQuit, &StubPayloads);
        broker.subscribe(ExternalEvent::ControlPanelStateChange, Value::Null, DelayedSender::new(tx));
        broker.fire(InternalEvent::PlayerState, &StubPayloads);

        let result = rx.await.unwrap();
        let exiting = result.member("result").unwrap();
        assert_eq!(exiting, &Value::Bool(true));
    }

    #[test]
    fn firing_with_no_subscribers_is_a_no_op() {
        let broker = Broker::new();
        broker.fire(InternalEvent::Volume, &StubPayloads);
        assert_eq!(broker.pending_count(ExternalEvent::ControlPanelStateChange), 0);
    }
}
