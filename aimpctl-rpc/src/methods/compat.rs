//! `EmulationOfWebCtlPlugin`: the single method the query-string frontend
//! dispatches to. Bridges the legacy `action=...` dialect onto the same
//! control/player primitives the named methods use, always answering with
//! a plain string result (the dialect has no structured result shape).

use std::sync::Arc;

use aimpctl_value::Value;
use async_trait::async_trait;

use crate::error::{Result, RpcError};
use crate::player::StatusKnob;
use crate::registry::{DelayedSender, Method, MethodRegistry, Outcome};

use super::Context;

pub struct EmulationOfWebCtlPlugin(Arc<Context>);

#[async_trait]
impl Method for EmulationOfWebCtlPlugin {
    async fn invoke(&self, params: Value, _delayed: DelayedSender) -> Result<Outcome> {
        let action = params.member("action")?.as_str()?;
        let reply = match action {
            "get_volume" => self.0.player.get_status(StatusKnob::Volume).map_err(|_| RpcError::StatusSetFailed)?.to_string(),
            "set_volume" => {
                let level = params.member("volume")?.as_int()?;
                if !(0..=100).contains(&level) {
                    return Err(RpcError::VolumeOutOfRange);
                }
                self.0.player.set_status(StatusKnob::Volume, level).map_err(|_| RpcError::VolumeSetFailed)?;
                level.to_string()
            }
            "play" => {
                self.0.player.play(None).map_err(|_| RpcError::PlaybackFailed)?;
                "OK".to_owned()
            }
            "pause" => {
                self.0.player.pause().map_err(|_| RpcError::PlaybackFailed)?;
                "OK".to_owned()
            }
            "stop" => {
                self.0.player.stop().map_err(|_| RpcError::PlaybackFailed)?;
                "OK".to_owned()
            }
            "next" => {
                self.0.player.play_next().map_err(|_| RpcError::PlaybackFailed)?;
                "OK".to_owned()
            }
            "prev" => {
                self.0.player.play_previous().map_err(|_| RpcError::PlaybackFailed)?;
                "OK".to_owned()
            }
            "get_status" => self.0.player.control_panel_snapshot().playback_state.wire_name().to_owned(),
            other => return Err(RpcError::WrongArgument(format!("unknown compat action '{other}'"))),
        };
        Ok(Outcome::Immediate(Value::String(reply)))
    }
}

pub fn register_compat_method(registry: &mut MethodRegistry, ctx: Arc<Context>) {
    registry.register("EmulationOfWebCtlPlugin", Arc::new(EmulationOfWebCtlPlugin(ctx)));
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
    async fn get_volume_reports_the_current_level_as_a_string() {
        let ctx = context();
        let mut params = Value::object();
        params.set_member("action", Value::String("get_volume".into())).unwrap();
        let outcome = invoke(&EmulationOfWebCtlPlugin(ctx), params).await.unwrap();
        match outcome {
            Outcome::Immediate(Value::String(s)) => assert_eq!(s, "50"),
            _ => panic!("expected a string result"),
        }
    }

    #[tokio::test]
    async fn unknown_action_is_a_wrong_argument_error() {
        let ctx = context();
        let mut params = Value::object();
        params.set_member("action", Value::String("bogus".into())).unwrap();
        let err = invoke(&EmulationOfWebCtlPlugin(ctx), params).await.unwrap_err();
        assert_eq!(err.code(), 11);
    }
}
