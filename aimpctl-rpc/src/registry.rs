//! Method registry and dispatch outcome. A method either answers
//! immediately or opts into deferred delivery through a delayed-sender
//! handle installed just for its invocation.

use std::collections::HashMap;
use std::sync::Arc;

use aimpctl_value::Value;
use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::Result;

/// The one-shot channel a handler can use to defer its reply. Dropping it
/// without sending makes any later `send` a documented no-op.
pub struct DelayedSender {
    tx: Option<oneshot::Sender<Value>>,
}

impl DelayedSender {
    pub fn new(tx: oneshot::Sender<Value>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn send(mut self, value: Value) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(value);
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Immediate(Value),
    /// The handler installed a delayed sender and the broker will reply
    /// later; the dispatcher must not serialize anything now.
    Delayed,
}

#[async_trait]
pub trait Method: Send + Sync {
    async fn invoke(&self, params: Value, delayed: DelayedSender) -> Result<Outcome>;
}

#[async_trait]
impl<F> Method for F
where
    F: Fn(Value, DelayedSender) -> futures::future::BoxFuture<'static, Result<Outcome>> + Send + Sync,
{
    async fn invoke(&self, params: Value, delayed: DelayedSender) -> Result<Outcome> {
        (self)(params, delayed).await
    }
}

#[derive(Default)]
pub struct MethodRegistry {
    methods: HashMap<String, Arc<dyn Method>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name`, panicking on a duplicate — method names are a
    /// build-time invariant of the registry's owner, not a runtime input.
    pub fn register(&mut self, name: impl Into<String>, method: Arc<dyn Method>) {
        let name = name.into();
        assert!(
            self.methods.insert(name.clone(), method).is_none(),
            "duplicate method registration: {name}"
        );
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Method>> {
        self.methods.get(name).cloned()
    }
}
