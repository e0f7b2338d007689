//! JSON-RPC 2.0 frontend. Numeric literals round-trip as int, uint, or
//! double: an integral literal that fits `i32` becomes `Int`, a non-negative
//! integral literal that overflows `i32` becomes `UInt`, everything else
//! becomes `Double`.

use std::collections::BTreeMap;

use aimpctl_value::Value;
use serde_json::json;

use super::{Frontend, RequestEnvelope};
use crate::error::{Result, RpcError};

pub struct JsonRpcFrontend;

impl Frontend for JsonRpcFrontend {
    fn name(&self) -> &'static str {
        "json-rpc"
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn can_handle_request(&self, _uri: &str) -> bool {
        // Registered last among the POST-body frontends; the dispatcher only
        // consults this predicate once XML-RPC's `/RPC_XML` path has missed.
        true
    }

    fn parse(&self, _uri: &str, body: &[u8]) -> Result<RequestEnvelope> {
        let root: serde_json::Value =
            serde_json::from_slice(body).map_err(|_| RpcError::RequestParsing)?;
        let method = root
            .get("method")
            .and_then(|m| m.as_str())
            .ok_or(RpcError::RequestParsing)?
            .to_owned();
        let params = root
            .get("params")
            .map(json_to_value)
            .unwrap_or(Value::object());
        let id = root.get("id").map(json_to_value).unwrap_or(Value::Null);
        Ok(RequestEnvelope { method, params, id })
    }

    fn serialize_success(&self, request: &RequestEnvelope, result: Value) -> Result<Vec<u8>> {
        let body = json!({
            "jsonrpc": "2.0",
            "result": value_to_json(&result),
            "id": value_to_json(&request.id),
        });
        Ok(body.to_string().into_bytes())
    }

    fn serialize_fault(&self, request_id: &Value, error: &RpcError) -> Vec<u8> {
        let body = json!({
            "jsonrpc": "2.0",
            "error": { "code": error.code(), "message": error.to_string() },
            "id": value_to_json(request_id),
        });
        body.to_string().into_bytes()
    }
}

pub fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                if let Ok(i) = i32::try_from(i) {
                    Value::Int(i)
                } else if let Ok(u) = u32::try_from(i) {
                    Value::UInt(u)
                } else {
                    Value::Double(i as f64)
                }
            } else if let Some(u) = n.as_u64() {
                u32::try_from(u).map(Value::UInt).unwrap_or(Value::Double(u as f64))
            } else {
                Value::Double(n.as_f64().unwrap_or_default())
            }
        }
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::Array(items.iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => {
            let mut out = BTreeMap::new();
            for (k, v) in map {
                out.insert(k.clone(), json_to_value(v));
            }
            Value::Object(out)
        }
    }
}

pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::None | Value::Null => serde_json::Value::Null,
        Value::Bool(b) => json!(*b),
        Value::Int(i) => json!(*i),
        Value::UInt(u) => json!(*u),
        Value::Double(d) => json!(*d),
        Value::String(s) => json!(s),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                out.insert(k.clone(), value_to_json(v));
            }
            serde_json::Value::Object(out)
        }
    }
}
