//! The schema tree: `FeatureType` is a closed, variant-dispatch enum
//! tagged externally by a `_type` string instead of
//! `#[serde(untagged)]`, so a manifest can read the discriminator
//! before committing to a variant's field set.

pub mod audio;
pub mod json;
pub mod tensor;
pub mod text;

pub use audio::Audio;
pub use json::Json;
pub use tensor::{Scalar, Tensor};
pub use text::Text;

use crate::codec::{Codec, Collaborators, DecodeInput};
use crate::error::{Error, Result};
use crate::shape::Shape;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single node of the schema tree.
#[derive(Clone, Debug, PartialEq)]
pub enum FeatureType {
  Tensor(Tensor),
  Scalar(Scalar),
  Text(Text),
  Json(Json),
  Audio(Audio),
  Sequence(Sequence),
  OrderedList(Box<FeatureType>),
  Mapping(BTreeMap<String, FeatureType>),
}

/// `Sequence.feature`: either a single nested schema (`[a, a, a, ...]`)
/// or a struct of columns (`{"a": [...], "b": [...]}`).
#[derive(Clone, Debug, PartialEq)]
pub enum SequenceFeature {
  Single(Box<FeatureType>),
  Struct(BTreeMap<String, FeatureType>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sequence {
  pub feature: Box<SequenceFeature>,
  pub length: i64,
}

impl FeatureType {
  /// Encodes a value already known to have reached a leaf schema.
  /// Panics (via `unreachable!`) if called on a composite variant;
  /// `nested.rs` only ever calls this after matching out `Mapping`,
  /// `OrderedList` and `Sequence`.
  pub(crate) fn encode_leaf(&self, value: &Value, collab: &Collaborators<'_>) -> Result<Vec<u8>> {
    match self {
      FeatureType::Tensor(t) => t.encode(value, collab),
      FeatureType::Scalar(s) => s.encode(value, collab),
      FeatureType::Text(t) => t.encode(value, collab),
      FeatureType::Json(j) => j.encode(value, collab),
      FeatureType::Audio(a) => a.encode(value, collab),
      _ => unreachable!("encode_leaf called on a composite schema"),
    }
  }

  pub(crate) fn decode_leaf(&self, input: DecodeInput, collab: &Collaborators<'_>) -> Result<Value> {
    match self {
      FeatureType::Tensor(t) => t.decode(input, collab),
      FeatureType::Scalar(s) => s.decode(input, collab),
      FeatureType::Text(t) => t.decode(input, collab),
      FeatureType::Json(j) => j.decode(input, collab),
      FeatureType::Audio(a) => a.decode(input, collab),
      _ => unreachable!("decode_leaf called on a composite schema"),
    }
  }

  pub fn is_leaf(&self) -> bool {
    matches!(
      self,
      FeatureType::Tensor(_)
        | FeatureType::Scalar(_)
        | FeatureType::Text(_)
        | FeatureType::Json(_)
        | FeatureType::Audio(_)
    )
  }

  /// Parses a schema node from its manifest JSON representation: reads
  /// `_type` before deciding which fields to parse, tolerating unknown
  /// fields per variant, and falling back to a plain `Mapping` when
  /// there is no `_type` key.
  pub fn from_json(value: &serde_json::Value) -> Result<FeatureType> {
    let map = value
      .as_object()
      .ok_or_else(|| Error::schema_mismatch("expected a JSON object for a feature node"))?;

    let type_tag = match map.get("_type") {
      Some(serde_json::Value::String(s)) => Some(s.as_str()),
      Some(_) => return Err(Error::schema_mismatch("_type must be a string")),
      None => None,
    };

    let field = |name: &str| -> Result<&serde_json::Value> {
      map
        .get(name)
        .ok_or_else(|| Error::schema_mismatch(format!("missing field `{}`", name)))
    };
    let dtype = |name: &str| -> Result<String> {
      field(name)?
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| Error::schema_mismatch(format!("field `{}` must be a string", name)))
    };
    let shape = |name: &str| -> Result<Shape> {
      serde_json::from_value(field(name)?.clone())
        .map_err(|e| Error::schema_mismatch(format!("invalid shape in `{}`: {}", name, e)))
    };

    Ok(match type_tag {
      Some("Tensor") => FeatureType::Tensor(Tensor::new(shape("shape")?, dtype("dtype")?)),
      Some("Scalar") => FeatureType::Scalar(Scalar::new(dtype("dtype")?)),
      Some("Text") => FeatureType::Text(Text),
      Some("Json") => FeatureType::Json(Json),
      Some("Audio") => {
        let sample_rate = map
          .get("sample_rate")
          .and_then(|v| v.as_u64())
          .map(|v| v as u32);
        let lazy_decode = map
          .get("lazy_decode")
          .and_then(|v| v.as_bool())
          .unwrap_or(true);
        FeatureType::Audio(Audio {
          shape: shape("shape")?,
          dtype: dtype("dtype")?,
          sample_rate,
          lazy_decode,
        })
      }
      Some("Sequence") => {
        let feature = SequenceFeature::from_json(field("feature")?)?;
        let length = map.get("length").and_then(|v| v.as_i64()).unwrap_or(-1);
        FeatureType::Sequence(Sequence {
          feature: Box::new(feature),
          length,
        })
      }
      Some("OrderedList") => FeatureType::OrderedList(Box::new(FeatureType::from_json(field("feature")?)?)),
      Some(other) => {
        return Err(Error::schema_mismatch(format!(
          "unknown feature _type: {}",
          other
        )))
      }
      None => {
        let inner: Result<BTreeMap<String, FeatureType>> = map
          .iter()
          .map(|(k, v)| Ok((k.clone(), FeatureType::from_json(v)?)))
          .collect();
        FeatureType::Mapping(inner?)
      }
    })
  }

  pub fn to_json(&self) -> serde_json::Value {
    match self {
      FeatureType::Tensor(t) => serde_json::json!({
        "_type": "Tensor",
        "shape": t.shape,
        "dtype": t.dtype,
      }),
      FeatureType::Scalar(s) => serde_json::json!({
        "_type": "Scalar",
        "dtype": s.dtype,
      }),
      FeatureType::Text(_) => serde_json::json!({"_type": "Text"}),
      FeatureType::Json(_) => serde_json::json!({"_type": "Json"}),
      FeatureType::Audio(a) => serde_json::json!({
        "_type": "Audio",
        "shape": a.shape,
        "dtype": a.dtype,
        "sample_rate": a.sample_rate,
        "lazy_decode": a.lazy_decode,
      }),
      FeatureType::Sequence(s) => serde_json::json!({
        "_type": "Sequence",
        "feature": s.feature.to_json(),
        "length": s.length,
      }),
      FeatureType::OrderedList(inner) => serde_json::json!({
        "_type": "OrderedList",
        "feature": inner.to_json(),
      }),
      FeatureType::Mapping(fields) => {
        let mut obj = serde_json::Map::new();
        for (k, v) in fields {
          obj.insert(k.clone(), v.to_json());
        }
        serde_json::Value::Object(obj)
      }
    }
  }
}

impl SequenceFeature {
  fn from_json(value: &serde_json::Value) -> Result<SequenceFeature> {
    let has_type_tag = value
      .as_object()
      .map(|m| m.contains_key("_type"))
      .unwrap_or(false);
    if has_type_tag {
      Ok(SequenceFeature::Single(Box::new(FeatureType::from_json(
        value,
      )?)))
    } else {
      match FeatureType::from_json(value)? {
        FeatureType::Mapping(fields) => Ok(SequenceFeature::Struct(fields)),
        other => Ok(SequenceFeature::Single(Box::new(other))),
      }
    }
  }

  fn to_json(&self) -> serde_json::Value {
    match self {
      SequenceFeature::Single(f) => f.to_json(),
      SequenceFeature::Struct(fields) => {
        let mut obj = serde_json::Map::new();
        for (k, v) in fields {
          obj.insert(k.clone(), v.to_json());
        }
        serde_json::Value::Object(obj)
      }
    }
  }
}

impl Serialize for FeatureType {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    self.to_json().serialize(serializer)
  }
}

impl<'de> Deserialize<'de> for FeatureType {
  fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
  where
    D: serde::Deserializer<'de>,
  {
    let value = serde_json::Value::deserialize(deserializer)?;
    FeatureType::from_json(&value).map_err(serde::de::Error::custom)
  }
}

/// The top-level schema: a name-ordered mapping of column names to
/// feature nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Features(pub BTreeMap<String, FeatureType>);

impl Features {
  pub fn new(fields: BTreeMap<String, FeatureType>) -> Self {
    Features(fields)
  }

  pub fn get(&self, name: &str) -> Option<&FeatureType> {
    self.0.get(name)
  }
}
