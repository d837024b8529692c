//! `Value` is the live, in-memory representation of a record or a piece
//! of one: what callers hand to `encode_nested` and get back from
//! `decode_nested`.

use crate::collab::{AudioDecoder, NdArray};
use std::collections::BTreeMap;

/// A decoded or to-be-encoded value: the primitive cases plus the
/// composite and tensor/audio shapes this crate's schema needs.
pub enum Value {
  Null,
  Text(String),
  Json(serde_json::Value),
  Tensor(NdArray),
  /// Raw encoded audio file bytes, as handed to `Audio::encode`.
  AudioBytes(Vec<u8>),
  /// A lazily-decodable audio stream, as returned by `Audio::decode`.
  AudioDecoder(Box<dyn AudioDecoder>),
  List(Vec<Value>),
  Struct(BTreeMap<String, Value>),
}

impl Value {
  pub fn is_null(&self) -> bool {
    matches!(self, Value::Null)
  }

  pub fn as_text(&self) -> Option<&str> {
    match self {
      Value::Text(s) => Some(s.as_str()),
      _ => None,
    }
  }

  pub fn as_list(&self) -> Option<&[Value]> {
    match self {
      Value::List(v) => Some(v.as_slice()),
      _ => None,
    }
  }

  pub fn as_struct(&self) -> Option<&BTreeMap<String, Value>> {
    match self {
      Value::Struct(m) => Some(m),
      _ => None,
    }
  }

  pub fn into_list(self) -> Option<Vec<Value>> {
    match self {
      Value::List(v) => Some(v),
      _ => None,
    }
  }

  pub fn into_struct(self) -> Option<BTreeMap<String, Value>> {
    match self {
      Value::Struct(m) => Some(m),
      _ => None,
    }
  }
}

impl std::fmt::Debug for Value {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Value::Null => write!(f, "Null"),
      Value::Text(s) => write!(f, "Text({:?})", s),
      Value::Json(v) => write!(f, "Json({})", v),
      Value::Tensor(t) => write!(f, "Tensor(shape={:?}, dtype={})", t.shape, t.dtype),
      Value::AudioBytes(b) => write!(f, "AudioBytes({} bytes)", b.len()),
      Value::AudioDecoder(_) => write!(f, "AudioDecoder(..)"),
      Value::List(v) => f.debug_list().entries(v.iter()).finish(),
      Value::Struct(m) => f.debug_map().entries(m.iter()).finish(),
    }
  }
}
