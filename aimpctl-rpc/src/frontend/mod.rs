//! Frontend trait: URI-predicate selection, body parsing into the uniform
//! `Value` envelope, and fault/success serialization back to wire bytes.

pub mod json_rpc;
pub mod query_string;
pub mod xml_rpc;

use aimpctl_value::Value;

use crate::error::{Result, RpcError};

/// A parsed request: `method`, `params`, and `id` (injected as `null` when
/// the wire format has none).
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    pub method: String,
    pub params: Value,
    pub id: Value,
}

pub trait Frontend: Send + Sync {
    fn name(&self) -> &'static str;
    fn content_type(&self) -> &'static str;
    fn can_handle_request(&self, uri: &str) -> bool;
    fn parse(&self, uri: &str, body: &[u8]) -> Result<RequestEnvelope>;
    /// Encodes a successful result for the wire. Fallible: XML-RPC has no
    /// unsigned integer type, so a `Value::UInt` that doesn't fit `i32` is a
    /// `VALUE_RANGE_ERROR` rather than a silently truncated `<int>`.
    fn serialize_success(&self, request: &RequestEnvelope, result: Value) -> Result<Vec<u8>>;
    fn serialize_fault(&self, request_id: &Value, error: &RpcError) -> Vec<u8>;
}

pub use json_rpc::JsonRpcFrontend;
pub use query_string::QueryStringFrontend;
pub use xml_rpc::XmlRpcFrontend;

/// Selects the first frontend (in registration order) whose predicate
/// matches. Returns `None` if no frontend claims the URI.
pub fn select(frontends: &[std::sync::Arc<dyn Frontend>], uri: &str) -> Option<std::sync::Arc<dyn Frontend>> {
    frontends.iter().find(|f| f.can_handle_request(uri)).cloned()
}
