//! Ties frontend selection, parsing, method lookup, and invocation together.
//! Mirrors the six-step dispatch recipe: select → parse → lookup → install
//! delayed-sender → invoke → translate faults.

use std::sync::Arc;

use aimpctl_value::Value;
use tokio::sync::oneshot;

use crate::error::{Result, RpcError};
use crate::frontend::{select, Frontend, RequestEnvelope};
use crate::registry::{DelayedSender, MethodRegistry, Outcome};

pub struct Dispatcher {
    frontends: Vec<Arc<dyn Frontend>>,
    registry: MethodRegistry,
}

/// What the transport does with a dispatched request: reply now, or hold
/// the connection open until the broker fires the held `oneshot::Receiver`.
/// A pending reply keeps the originating frontend and request id so the
/// eventual value is rendered through the same encoding the caller spoke,
/// instead of a transport-wide default.
pub enum DispatchResult {
    Reply { body: Vec<u8>, content_type: &'static str },
    Pending { frontend: Arc<dyn Frontend>, request_id: Value, rx: oneshot::Receiver<Value> },
}

impl Dispatcher {
    pub fn new(frontends: Vec<Arc<dyn Frontend>>, registry: MethodRegistry) -> Self {
        Self { frontends, registry }
    }

    pub async fn dispatch(&self, uri: &str, body: &[u8]) -> DispatchResult {
        let frontend = match select(&self.frontends, uri) {
            Some(f) => f,
            None => {
                return DispatchResult::Reply {
                    body: self.frontends.first().map(|f| f.serialize_fault(&Value::Null, &RpcError::MethodNotFound(uri.to_owned()))).unwrap_or_default(),
                    content_type: "text/plain",
                }
            }
        };

        let envelope = match frontend.parse(uri, body) {
            Ok(e) => e,
            Err(err) => {
                return DispatchResult::Reply {
                    body: frontend.serialize_fault(&Value::Null, &err),
                    content_type: frontend.content_type(),
                }
            }
        };

        let method = match self.registry.get(&envelope.method) {
            Some(m) => m,
            None => {
                let err = RpcError::MethodNotFound(envelope.method.clone());
                return DispatchResult::Reply {
                    body: frontend.serialize_fault(&envelope.id, &err),
                    content_type: frontend.content_type(),
                };
            }
        };

        let (tx, rx) = oneshot::channel();
        let delayed = DelayedSender::new(tx);

        match method.invoke(envelope.params.clone(), delayed).await {
            Ok(Outcome::Immediate(result)) => reply_or_fault(frontend.as_ref(), &envelope, result),
            Ok(Outcome::Delayed) => DispatchResult::Pending { frontend, request_id: envelope.id, rx },
            Err(err) => DispatchResult::Reply {
                body: frontend.serialize_fault(&envelope.id, &err),
                content_type: frontend.content_type(),
            },
        }
    }

    pub fn frontend_for(&self, uri: &str) -> Option<Arc<dyn Frontend>> {
        select(&self.frontends, uri)
    }
}

fn reply_or_fault(frontend: &dyn Frontend, envelope: &RequestEnvelope, result: Value) -> DispatchResult {
    match frontend.serialize_success(envelope, result) {
        Ok(body) => DispatchResult::Reply { body, content_type: frontend.content_type() },
        Err(err) => DispatchResult::Reply {
            body: frontend.serialize_fault(&envelope.id, &err),
            content_type: frontend.content_type(),
        },
    }
}

/// Renders a value that arrived after the initial reply (a fired
/// subscription) through the frontend that originated the request, so a
/// JSON-RPC subscriber still gets its `"jsonrpc":"2.0"` envelope and an
/// XML-RPC subscriber gets `<methodResponse>` XML rather than raw JSON.
pub fn render_pending(frontend: &dyn Frontend, request_id: &Value, value: Value) -> (Vec<u8>, &'static str) {
    let envelope = RequestEnvelope { method: String::new(), params: Value::Null, id: request_id.clone() };
    match frontend.serialize_success(&envelope, value) {
        Ok(body) => (body, frontend.content_type()),
        Err(err) => (frontend.serialize_fault(request_id, &err), frontend.content_type()),
    }
}
