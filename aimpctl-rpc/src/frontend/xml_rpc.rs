//! XML-RPC frontend: a subset of the spec sufficient for this surface.
//! `<value>` may wrap `<string>`/`<int>`/`<i4>`/`<boolean>`/`<double>`, be
//! bare text (implicit string), be `<nil/>`, or nest `<array>`/`<struct>`.
//! `<dateTime.iso8601>` and `<base64>` are accepted on input (kept as
//! strings) but never produced, since the value model has no date/blob type.

use std::collections::BTreeMap;

use aimpctl_value::Value;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::{Frontend, RequestEnvelope};
use crate::error::{Result, RpcError};

pub struct XmlRpcFrontend;

impl Frontend for XmlRpcFrontend {
    fn name(&self) -> &'static str {
        "xml-rpc"
    }

    fn content_type(&self) -> &'static str {
        "text/xml"
    }

    fn can_handle_request(&self, uri: &str) -> bool {
        uri == "/RPC_XML" || uri.starts_with("/RPC_XML")
    }

    fn parse(&self, _uri: &str, body: &[u8]) -> Result<RequestEnvelope> {
        parse_method_call(body).map_err(|_| RpcError::RequestParsing)
    }

    fn serialize_success(&self, request: &RequestEnvelope, result: Value) -> Result<Vec<u8>> {
        let _ = &request.id;
        Ok(format!(
            "<?xml version=\"1.0\"?><methodResponse><params><param>{}</param></params></methodResponse>",
            value_to_xml(&result)?
        )
        .into_bytes())
    }

    fn serialize_fault(&self, _request_id: &Value, error: &RpcError) -> Vec<u8> {
        let mut fault = BTreeMap::new();
        fault.insert("faultCode".to_owned(), Value::Int(error.code()));
        fault.insert("faultString".to_owned(), Value::String(error.to_string()));
        format!(
            "<?xml version=\"1.0\"?><methodResponse><fault>{}</fault></methodResponse>",
            // faultCode/faultString are always Int/String, never a narrowing UInt.
            value_to_xml(&Value::Object(fault)).unwrap_or_default()
        )
        .into_bytes()
    }
}

fn parse_method_call(body: &[u8]) -> std::result::Result<RequestEnvelope, quick_xml::Error> {
    let mut reader = Reader::from_reader(body);
    {
        let config = reader.config_mut();
        config.trim_text_start = true;
        config.trim_text_end = true;
    }
    let mut buf = Vec::new();

    let mut method = String::new();
    let mut params = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) if tag.local_name().as_ref() == b"methodName" => {
                if let Event::Text(t) = reader.read_event_into(&mut buf)? {
                    method = t.decode()?.into_owned();
                }
            }
            Event::Start(tag) if tag.local_name().as_ref() == b"value" => {
                params.push(parse_value_contents(&mut reader, &mut buf)?);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let params_value = Value::Array(params);
    Ok(RequestEnvelope {
        method,
        params: params_value,
        id: Value::Null,
    })
}

/// Called immediately after consuming the opening `<value>` tag; reads
/// through the matching `</value>`.
fn parse_value_contents(
    reader: &mut Reader<&[u8]>,
    buf: &mut Vec<u8>,
) -> std::result::Result<Value, quick_xml::Error> {
    buf.clear();
    match reader.read_event_into(buf)? {
        Event::End(tag) if tag.local_name().as_ref() == b"value" => Ok(Value::String(String::new())),
        Event::Text(t) => {
            let text = t.decode()?.into_owned();
            // consume the closing </value>
            skip_to_end(reader, buf, b"value")?;
            Ok(Value::String(text))
        }
        Event::Empty(tag) if tag.local_name().as_ref() == b"nil" => {
            skip_to_end(reader, buf, b"value")?;
            Ok(Value::Null)
        }
        Event::Start(tag) => {
            let name = tag.local_name().as_ref().to_vec();
            // `parse_typed_value` consumes through its own closing tag.
            let value = parse_typed_value(reader, buf, &name)?;
            skip_to_end(reader, buf, b"value")?;
            Ok(value)
        }
        _ => Ok(Value::String(String::new())),
    }
}

fn parse_typed_value(
    reader: &mut Reader<&[u8]>,
    buf: &mut Vec<u8>,
    tag: &[u8],
) -> std::result::Result<Value, quick_xml::Error> {
    match tag {
        b"int" | b"i4" => {
            let text = read_text_allow_empty(reader, buf)?;
            Ok(Value::Int(text.parse().unwrap_or_default()))
        }
        b"boolean" => {
            let text = read_text_allow_empty(reader, buf)?;
            Ok(Value::Bool(text.trim() == "1"))
        }
        b"double" => {
            let text = read_text_allow_empty(reader, buf)?;
            Ok(Value::Double(text.parse().unwrap_or_default()))
        }
        b"string" | b"dateTime.iso8601" | b"base64" => {
            let text = read_text_allow_empty(reader, buf)?;
            Ok(Value::String(text))
        }
        b"array" => parse_array(reader, buf),
        b"struct" => parse_struct(reader, buf),
        _ => Ok(Value::String(String::new())),
    }
}

fn parse_array(
    reader: &mut Reader<&[u8]>,
    buf: &mut Vec<u8>,
) -> std::result::Result<Value, quick_xml::Error> {
    let mut items = Vec::new();
    // expect <data>
    loop {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::Start(tag) if tag.local_name().as_ref() == b"data" => break,
            Event::End(tag) if tag.local_name().as_ref() == b"array" => return Ok(Value::Array(items)),
            Event::Eof => return Ok(Value::Array(items)),
            _ => {}
        }
    }
    loop {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::Start(tag) if tag.local_name().as_ref() == b"value" => {
                items.push(parse_value_contents(reader, buf)?);
            }
            Event::End(tag) if tag.local_name().as_ref() == b"data" => break,
            Event::Eof => break,
            _ => {}
        }
    }
    skip_to_end(reader, buf, b"array")?;
    Ok(Value::Array(items))
}

fn parse_struct(
    reader: &mut Reader<&[u8]>,
    buf: &mut Vec<u8>,
) -> std::result::Result<Value, quick_xml::Error> {
    let mut map = BTreeMap::new();
    loop {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::Start(tag) if tag.local_name().as_ref() == b"member" => {
                let mut name = String::new();
                let mut value = Value::Null;
                loop {
                    buf.clear();
                    match reader.read_event_into(buf)? {
                        Event::Start(t) if t.local_name().as_ref() == b"name" => {
                            name = read_text_allow_empty(reader, buf)?;
                        }
                        Event::Start(t) if t.local_name().as_ref() == b"value" => {
                            value = parse_value_contents(reader, buf)?;
                        }
                        Event::End(t) if t.local_name().as_ref() == b"member" => break,
                        Event::Eof => break,
                        _ => {}
                    }
                }
                map.insert(name, value);
            }
            Event::End(tag) if tag.local_name().as_ref() == b"struct" => break,
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(Value::Object(map))
}

/// Reads a scalar element's text content, tolerating an immediately-closed
/// (empty) element where no `Text` event is emitted at all.
fn read_text_allow_empty(
    reader: &mut Reader<&[u8]>,
    buf: &mut Vec<u8>,
) -> std::result::Result<String, quick_xml::Error> {
    buf.clear();
    match reader.read_event_into(buf)? {
        Event::Text(t) => {
            let text = t.decode()?.into_owned();
            buf.clear();
            let _ = reader.read_event_into(buf)?; // closing tag
            Ok(text)
        }
        Event::End(_) => Ok(String::new()),
        _ => Ok(String::new()),
    }
}

fn skip_to_end(
    reader: &mut Reader<&[u8]>,
    buf: &mut Vec<u8>,
    tag: &[u8],
) -> std::result::Result<(), quick_xml::Error> {
    loop {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::End(t) if t.local_name().as_ref() == tag => return Ok(()),
            Event::Eof => return Ok(()),
            _ => {}
        }
    }
}

/// XML-RPC has no unsigned integer type: a `UInt` is narrowed to `i32`,
/// which fails with `VALUE_RANGE_ERROR` for anything above `i32::MAX`.
fn value_to_xml(value: &Value) -> Result<String> {
    Ok(match value {
        Value::None | Value::Null => "<value><nil/></value>".to_owned(),
        Value::Bool(b) => format!("<value><boolean>{}</boolean></value>", if *b { 1 } else { 0 }),
        Value::Int(i) => format!("<value><int>{i}</int></value>"),
        Value::UInt(_) => format!("<value><int>{}</int></value>", value.as_int_narrowing()?),
        Value::Double(d) => format!("<value><double>{d}</double></value>"),
        Value::String(s) => format!("<value><string>{}</string></value>", escape_xml(s)),
        Value::Array(items) => {
            let mut body = String::new();
            for item in items {
                body.push_str(&value_to_xml(item)?);
            }
            format!("<value><array><data>{body}</data></array></value>")
        }
        Value::Object(map) => {
            let mut body = String::new();
            for (k, v) in map {
                body.push_str(&format!("<member><name>{}</name>{}</member>", escape_xml(k), value_to_xml(v)?));
            }
            format!("<value><struct>{body}</struct></value>")
        }
    })
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
