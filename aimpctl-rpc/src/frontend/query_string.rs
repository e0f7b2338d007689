//! Legacy query-string ("compat") frontend: `k1=v1&k2=v2&…` becomes the
//! params object of a synthetic `EmulationOfWebCtlPlugin` call. No request
//! body is consulted; only the URI's query component matters.

use std::collections::BTreeMap;

use aimpctl_value::Value;

use super::json_rpc::value_to_json;
use super::{Frontend, RequestEnvelope};
use crate::error::{Result, RpcError};

pub struct QueryStringFrontend;

const SYNTHETIC_METHOD: &str = "EmulationOfWebCtlPlugin";

impl Frontend for QueryStringFrontend {
    fn name(&self) -> &'static str {
        "query-string"
    }

    fn content_type(&self) -> &'static str {
        "text/plain"
    }

    fn can_handle_request(&self, uri: &str) -> bool {
        uri.contains('?')
    }

    fn parse(&self, uri: &str, _body: &[u8]) -> Result<RequestEnvelope> {
        let query = uri.splitn(2, '?').nth(1).ok_or(RpcError::RequestParsing)?;
        let mut params = BTreeMap::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next().unwrap_or_default();
            let raw = parts.next().unwrap_or_default();
            params.insert(key.to_owned(), coerce(raw));
        }
        Ok(RequestEnvelope {
            method: SYNTHETIC_METHOD.to_owned(),
            params: Value::Object(params),
            id: Value::Null,
        })
    }

    fn serialize_success(&self, _request: &RequestEnvelope, result: Value) -> Result<Vec<u8>> {
        Ok(value_to_json(&result).to_string().into_bytes())
    }

    fn serialize_fault(&self, _request_id: &Value, error: &RpcError) -> Vec<u8> {
        format!("{{\"error\":{},\"message\":\"{}\"}}", error.code(), error).into_bytes()
    }
}

/// Coerces a raw query value to int, then uint, then string, in that order.
fn coerce(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i32>() {
        return Value::Int(i);
    }
    if let Ok(u) = raw.parse::<u32>() {
        return Value::UInt(u);
    }
    Value::String(raw.to_owned())
}
