//! Multi-frontend RPC dispatch: parses JSON-RPC, XML-RPC, and the legacy
//! query-string dialect into a uniform request envelope, routes it through
//! a method registry, and renders results back through the originating
//! frontend. Subscriptions, the scheduler, and rating writes live
//! alongside the dispatcher since they're all reached through the same
//! method surface.

pub mod broker;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod frontend;
pub mod methods;
pub mod player;
pub mod rating;
pub mod registry;
pub mod scheduler;

pub use broker::{Broker, ExternalEvent, InternalEvent};
pub use dispatch::{DispatchResult, Dispatcher};
pub use error::{Result, RpcError};
pub use frontend::{Frontend, JsonRpcFrontend, QueryStringFrontend, RequestEnvelope, XmlRpcFrontend};
pub use methods::Context;
pub use player::{PlayerBackend, PlayerError};
pub use rating::RatingWriter;
pub use registry::{DelayedSender, Method, MethodRegistry, Outcome};
pub use scheduler::Scheduler;

use std::sync::Arc;

/// Builds the dispatcher with all three frontends and every control/query
/// method registered. The subscription-aware methods (`SubscribeOnAIMPStateUpdateEvent`)
/// are registered separately by the caller once a [`Broker`] is constructed,
/// since the broker's lifetime is owned by the binary, not this crate.
pub fn build_dispatcher(ctx: Arc<Context>) -> Dispatcher {
    let mut registry = MethodRegistry::new();
    methods::register_control_methods(&mut registry, ctx.clone());
    methods::register_query_methods(&mut registry, ctx.clone());
    methods::register_compat_method(&mut registry, ctx);

    // XML-RPC and query-string claim a narrow URI shape; JSON-RPC's
    // predicate matches everything, so it must be registered last to act
    // as the catch-all.
    let frontends: Vec<Arc<dyn Frontend>> = vec![
        Arc::new(XmlRpcFrontend),
        Arc::new(QueryStringFrontend),
        Arc::new(JsonRpcFrontend),
    ];
    Dispatcher::new(frontends, registry)
}

/// Registers `SubscribeOnAIMPStateUpdateEvent`, the one method that needs
/// the broker rather than the store/player context.
pub fn register_subscribe_method(registry: &mut MethodRegistry, broker: Arc<Broker>) {
    registry.register("SubscribeOnAIMPStateUpdateEvent", Arc::new(SubscribeMethod(broker)));
}

struct SubscribeMethod(Arc<Broker>);

#[async_trait::async_trait]
impl Method for SubscribeMethod {
    async fn invoke(&self, params: aimpctl_value::Value, delayed: DelayedSender) -> Result<Outcome> {
        let event_name = params.member("event")?.as_str()?;
        let event = ExternalEvent::parse(event_name)
            .ok_or_else(|| RpcError::WrongArgument(format!("unknown subscription event '{event_name}'")))?;
        self.0.subscribe(event, params.member_opt("id")?.cloned().unwrap_or(aimpctl_value::Value::Null), delayed);
        Ok(Outcome::Delayed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aimpctl_value::Value;

    #[tokio::test]
    async fn subscribing_to_an_unknown_event_is_a_wrong_argument_error() {
        let mut registry = MethodRegistry::new();
        register_subscribe_method(&mut registry, Arc::new(Broker::new()));
        let method = registry.get("SubscribeOnAIMPStateUpdateEvent").unwrap();
        let mut params = Value::object();
        params.set_member("event", Value::String("bogus_event".into())).unwrap();
        let (tx, _rx) = tokio::sync::oneshot::channel();
        let err = method.invoke(params, DelayedSender::new(tx)).await.unwrap_err();
        assert_eq!(err.code(), 11);
    }

    #[tokio::test]
    async fn subscribing_to_a_known_event_defers() {
        let mut registry = MethodRegistry::new();
        register_subscribe_method(&mut registry, Arc::new(Broker::new()));
        let method = registry.get("SubscribeOnAIMPStateUpdateEvent").unwrap();
        let mut params = Value::object();
        params.set_member("event", Value::String("play_state_change".into())).unwrap();
        let (tx, _rx) = tokio::sync::oneshot::channel();
        let outcome = method.invoke(params, DelayedSender::new(tx)).await.unwrap();
        assert!(matches!(outcome, Outcome::Delayed));
    }

    struct StubPayloads;
    impl broker::EventPayloads for StubPayloads {
        fn play_state_change(&self) -> Value {
            Value::String("playing".into())
        }
        fn current_track_change(&self) -> Value {
            Value::Null
        }
        fn control_panel_state_change(&self, _aimp_app_is_exiting: bool) -> Value {
            Value::Null
        }
        fn playlists_content_change(&self) -> Value {
            Value::Null
        }
    }

    /// A fired subscription must be rendered through the frontend the
    /// subscriber originally spoke: JSON-RPC gets its envelope back,
    /// XML-RPC gets `<methodResponse>` XML, not a hardcoded JSON blob.
    #[tokio::test]
    async fn delayed_subscription_reply_is_rendered_through_the_originating_frontend() {
        let broker = Arc::new(Broker::new());
        let mut registry = MethodRegistry::new();
        register_subscribe_method(&mut registry, broker.clone());
        let frontends: Vec<Arc<dyn Frontend>> = vec![Arc::new(XmlRpcFrontend), Arc::new(JsonRpcFrontend)];
        let dispatcher = Dispatcher::new(frontends, registry);

        let result = dispatcher
            .dispatch("/RPC_XML", br#"<methodCall><methodName>SubscribeOnAIMPStateUpdateEvent</methodName>
                <params><param><value><struct>
                    <member><name>event</name><value><string>play_state_change</string></value></member>
                </struct></value></param></params></methodCall>"#)
            .await;

        let DispatchResult::Pending { frontend, request_id, rx } = result else {
            panic!("expected a pending reply");
        };
        broker.fire(InternalEvent::PlayerState, &StubPayloads);
        let value = rx.await.unwrap();
        let (body, content_type) = dispatch::render_pending(frontend.as_ref(), &request_id, value);
        let text = String::from_utf8(body).unwrap();
        assert_eq!(content_type, "text/xml");
        assert!(text.starts_with("<?xml"));
        assert!(text.contains("<methodResponse>"));
    }
}
