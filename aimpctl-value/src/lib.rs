//! Dynamic tagged value shared by every RPC frontend.
//!
//! `Value` is the single data model that the JSON-RPC, XML-RPC and
//! query-string frontends all parse into and serialize out of. It never
//! performs implicit conversions: reading a `String` out of a `Bool` is an
//! error, not a coercion. The only place a variant is ever chosen
//! automatically is when writing into an empty (`None`) slot, which
//! "materialises" into whatever variant the caller is writing.

use std::collections::BTreeMap;
use std::fmt;

pub mod error;
pub mod track;

pub use error::{ValueError, ValueErrorKind};
pub use track::{NothingPlayingError, TrackDescription, CURRENT_SENTINEL};

/// The set of variants a [`Value`] can hold, returned by [`Value::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    None,
    Null,
    Bool,
    Int,
    UInt,
    Double,
    String,
    Array,
    Object,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::None => "none",
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::UInt => "uint",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        };
        f.write_str(name)
    }
}

/// Dynamic value tree. Cloning is always a deep copy: arrays and objects own
/// their children outright, so no cycle can ever be constructed.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// An empty slot. Writing any typed value into it materialises that
    /// variant; reading from it is always a [`ValueErrorKind::Type`] error.
    #[default]
    None,
    Null,
    Bool(bool),
    Int(i32),
    UInt(u32),
    Double(f64),
    String(String),
    Array(Vec<Value>),
    /// Insertion order is not meaningful; consumers must not rely on it.
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn object() -> Value {
        Value::Object(BTreeMap::new())
    }

    pub fn array() -> Value {
        Value::Array(Vec::new())
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::None => ValueKind::None,
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::UInt(_) => ValueKind::UInt,
            Value::Double(_) => ValueKind::Double,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn type_error(&self, expected: ValueKind) -> ValueError {
        ValueError::new(
            ValueErrorKind::Type,
            format!("expected {expected}, found {}", self.kind()),
        )
    }

    // ---- typed-read: fails on mismatch, never auto-converts ----

    pub fn as_bool(&self) -> Result<bool, ValueError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(other.type_error(ValueKind::Bool)),
        }
    }

    pub fn as_int(&self) -> Result<i32, ValueError> {
        match self {
            Value::Int(i) => Ok(*i),
            other => Err(other.type_error(ValueKind::Int)),
        }
    }

    pub fn as_uint(&self) -> Result<u32, ValueError> {
        match self {
            Value::UInt(u) => Ok(*u),
            other => Err(other.type_error(ValueKind::UInt)),
        }
    }

    pub fn as_double(&self) -> Result<f64, ValueError> {
        match self {
            Value::Double(d) => Ok(*d),
            other => Err(other.type_error(ValueKind::Double)),
        }
    }

    pub fn as_str(&self) -> Result<&str, ValueError> {
        match self {
            Value::String(s) => Ok(s.as_str()),
            other => Err(other.type_error(ValueKind::String)),
        }
    }

    pub fn as_array(&self) -> Result<&[Value], ValueError> {
        match self {
            Value::Array(a) => Ok(a.as_slice()),
            other => Err(other.type_error(ValueKind::Array)),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut Vec<Value>, ValueError> {
        match self {
            Value::Array(a) => Ok(a),
            other => Err(other.type_error(ValueKind::Array)),
        }
    }

    pub fn as_object(&self) -> Result<&BTreeMap<String, Value>, ValueError> {
        match self {
            Value::Object(o) => Ok(o),
            other => Err(other.type_error(ValueKind::Object)),
        }
    }

    /// Narrows a `uint` down to `i32`, used by the XML-RPC serializer which
    /// has no unsigned integer type on the wire.
    pub fn as_int_narrowing(&self) -> Result<i32, ValueError> {
        match self {
            Value::Int(i) => Ok(*i),
            Value::UInt(u) => i32::try_from(*u).map_err(|_| {
                ValueError::new(
                    ValueErrorKind::Range,
                    format!("uint value {u} does not fit in a signed 32-bit integer"),
                )
            }),
            other => Err(other.type_error(ValueKind::Int)),
        }
    }

    // ---- typed-write: promotes `None` to the written variant ----

    fn ensure_none_or(&mut self, kind: ValueKind) -> Result<(), ValueError> {
        if matches!(self, Value::None) {
            return Ok(());
        }
        if self.kind() == kind {
            return Ok(());
        }
        Err(self.type_error(kind))
    }

    pub fn set_bool(&mut self, v: bool) -> Result<(), ValueError> {
        self.ensure_none_or(ValueKind::Bool)?;
        *self = Value::Bool(v);
        Ok(())
    }

    pub fn set_int(&mut self, v: i32) -> Result<(), ValueError> {
        self.ensure_none_or(ValueKind::Int)?;
        *self = Value::Int(v);
        Ok(())
    }

    pub fn set_uint(&mut self, v: u32) -> Result<(), ValueError> {
        self.ensure_none_or(ValueKind::UInt)?;
        *self = Value::UInt(v);
        Ok(())
    }

    pub fn set_double(&mut self, v: f64) -> Result<(), ValueError> {
        self.ensure_none_or(ValueKind::Double)?;
        *self = Value::Double(v);
        Ok(())
    }

    pub fn set_string(&mut self, v: impl Into<String>) -> Result<(), ValueError> {
        self.ensure_none_or(ValueKind::String)?;
        *self = Value::String(v.into());
        Ok(())
    }

    // ---- sequence-resize / array-index ----

    /// Resizes an array, promoting `None` into an empty array first.
    /// New slots are filled with `Value::None`.
    pub fn resize(&mut self, size: usize) -> Result<(), ValueError> {
        if matches!(self, Value::None) {
            *self = Value::array();
        }
        let arr = self.as_array_mut()?;
        arr.resize_with(size, || Value::None);
        Ok(())
    }

    pub fn len(&self) -> Result<usize, ValueError> {
        Ok(self.as_array()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, ValueError> {
        Ok(self.len()? == 0)
    }

    pub fn at(&self, index: usize) -> Result<&Value, ValueError> {
        let arr = self.as_array()?;
        arr.get(index).ok_or_else(|| {
            ValueError::new(
                ValueErrorKind::IndexRange,
                format!("index {index} out of range (len {})", arr.len()),
            )
        })
    }

    /// Indexes into an array, promoting `None` into an array sized to fit
    /// `index` when necessary (mirrors the source's auto-growing `operator[]`).
    pub fn at_mut(&mut self, index: usize) -> Result<&mut Value, ValueError> {
        if matches!(self, Value::None) {
            *self = Value::array();
        }
        let needs_growth = self.as_array()?.len() <= index;
        if needs_growth {
            self.resize(index + 1)?;
        }
        self.as_array_mut()?
            .get_mut(index)
            .ok_or_else(|| ValueError::new(ValueErrorKind::IndexRange, format!("index {index} out of range")))
    }

    // ---- object member access ----

    pub fn has_member(&self, name: &str) -> bool {
        matches!(self, Value::Object(o) if o.contains_key(name))
    }

    pub fn member(&self, name: &str) -> Result<&Value, ValueError> {
        let obj = self.as_object()?;
        obj.get(name).ok_or_else(|| {
            ValueError::new(ValueErrorKind::ObjectAccess, format!("no member named '{name}'"))
        })
    }

    /// Looks up an optional member: returns `None` when the object lacks the
    /// key at all (distinct from the key existing with value `Value::Null`).
    pub fn member_opt(&self, name: &str) -> Result<Option<&Value>, ValueError> {
        let obj = self.as_object()?;
        Ok(obj.get(name))
    }

    /// Sets an object member, promoting `None` into an empty object first.
    pub fn set_member(&mut self, name: impl Into<String>, value: Value) -> Result<(), ValueError> {
        if matches!(self, Value::None) {
            *self = Value::object();
        }
        match self {
            Value::Object(o) => {
                o.insert(name.into(), value);
                Ok(())
            }
            other => Err(other.type_error(ValueKind::Object)),
        }
    }

    pub fn members(&self) -> Result<impl Iterator<Item = (&String, &Value)>, ValueError> {
        Ok(self.as_object()?.iter())
    }

    pub fn swap(&mut self, other: &mut Value) {
        std::mem::swap(self, other);
    }

    pub fn reset(&mut self) {
        *self = Value::None;
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "<none>"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::UInt(u) => write!(f, "{u}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::String(s) => write!(f, "\"{s}\""),
            Value::Array(a) => {
                write!(f, "[")?;
                for (i, v) in a.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Object(o) => {
                write!(f, "{{")?;
                for (i, (k, v)) in o.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k:?}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_materialises_into_written_variant() {
        let mut v = Value::None;
        v.set_int(42).unwrap();
        assert_eq!(v.as_int().unwrap(), 42);
    }

    #[test]
    fn mismatched_typed_write_fails() {
        let mut v = Value::Bool(true);
        let err = v.set_int(1).unwrap_err();
        assert_eq!(err.kind(), ValueErrorKind::Type);
    }

    #[test]
    fn array_index_out_of_range_fails() {
        let v = Value::Array(vec![Value::Int(1)]);
        let err = v.at(5).unwrap_err();
        assert_eq!(err.kind(), ValueErrorKind::IndexRange);
    }

    #[test]
    fn object_access_error_on_missing_member() {
        let v = Value::object();
        let err = v.member("missing").unwrap_err();
        assert_eq!(err.kind(), ValueErrorKind::ObjectAccess);
    }

    #[test]
    fn uint_narrows_to_int_or_reports_range_error() {
        let fits = Value::UInt(10);
        assert_eq!(fits.as_int_narrowing().unwrap(), 10);

        let overflow = Value::UInt(u32::MAX);
        let err = overflow.as_int_narrowing().unwrap_err();
        assert_eq!(err.kind(), ValueErrorKind::Range);
    }

    #[test]
    fn deep_clone_does_not_alias() {
        let mut original = Value::array();
        original.resize(1).unwrap();
        original.at_mut(0).unwrap().set_string("hello").unwrap();

        let mut copy = original.clone();
        copy.at_mut(0).unwrap().set_string("ignored").unwrap_err();
        *copy.at_mut(0).unwrap() = Value::String("world".into());

        assert_eq!(original.at(0).unwrap().as_str().unwrap(), "hello");
        assert_eq!(copy.at(0).unwrap().as_str().unwrap(), "world");
    }

    #[test]
    fn display_renders_compact_text_for_diagnostics() {
        let mut v = Value::object();
        v.set_member("ok", Value::Bool(true)).unwrap();
        assert_eq!(v.to_string(), "{\"ok\": true}");
    }
}
