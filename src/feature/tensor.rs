//! Fixed- or partial-shape numeric arrays. Encode validates/coerces a
//! value against the declared shape and dtype; decode reads raw bytes
//! back through the same dtype/shape. `Scalar` is a `Tensor` pinned to
//! rank 0.

use crate::codec::{Codec, Collaborators, DecodeInput};
use crate::collab::NdArray;
use crate::error::{Error, Result};
use crate::shape::Shape;
use crate::value::Value;

#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
  pub shape: Shape,
  pub dtype: String,
}

impl Tensor {
  pub fn new(shape: Shape, dtype: impl Into<String>) -> Self {
    Tensor {
      shape,
      dtype: dtype.into(),
    }
  }
}

impl Codec for Tensor {
  fn encode(&self, value: &Value, collab: &Collaborators<'_>) -> Result<Vec<u8>> {
    if !collab.dtype.is_valid(&self.dtype) {
      return Err(Error::type_error(format!("unknown dtype: {}", self.dtype)));
    }
    let array = match value {
      Value::Tensor(nd) => nd.clone(),
      Value::Json(serde_json::Value::Array(_)) | Value::Json(serde_json::Value::Number(_)) => {
        coerce_json_to_tensor(value.as_json().unwrap(), &self.dtype)?
      }
      _ => return Err(Error::type_error("Tensor expects an array value")),
    };
    if array.dtype != self.dtype {
      return Err(Error::DTypeMismatch {
        expected: self.dtype.clone(),
        actual: array.dtype,
      });
    }
    let actual_shape = Shape::known(array.shape.clone());
    if !actual_shape.is_compatible_with(&self.shape) {
      return Err(Error::shape_mismatch(format!(
        "value shape {} is not compatible with declared shape {}",
        actual_shape, self.shape
      )));
    }
    Ok(array.bytes)
  }

  fn decode(&self, input: DecodeInput, collab: &Collaborators<'_>) -> Result<Value> {
    match input.into_bytes()? {
      None => Ok(Value::Null),
      Some(bytes) => {
        let array = collab.reshape.reshape(&bytes, &self.dtype, &self.shape)?;
        Ok(Value::Tensor(array))
      }
    }
  }
}

/// Rank-0 tensor. Kept as a distinct schema node (rather than a `Tensor`
/// with an empty shape) because `Scalar`'s manifest entry has no `shape`
/// field.
#[derive(Clone, Debug, PartialEq)]
pub struct Scalar {
  pub dtype: String,
}

impl Scalar {
  pub fn new(dtype: impl Into<String>) -> Self {
    Scalar { dtype: dtype.into() }
  }

  fn as_tensor(&self) -> Tensor {
    Tensor::new(Shape::known(Vec::new()), self.dtype.clone())
  }
}

impl Codec for Scalar {
  fn encode(&self, value: &Value, collab: &Collaborators<'_>) -> Result<Vec<u8>> {
    self.as_tensor().encode(value, collab)
  }

  fn decode(&self, input: DecodeInput, collab: &Collaborators<'_>) -> Result<Value> {
    self.as_tensor().decode(input, collab)
  }
}

impl Value {
  fn as_json(&self) -> Option<&serde_json::Value> {
    match self {
      Value::Json(v) => Some(v),
      _ => None,
    }
  }
}

/// Flattens a JSON number/nested-array value into raw little-endian
/// bytes under `dtype`, inferring the shape from nesting depth, the way
/// `np.asarray` does for a plain Python list.
fn coerce_json_to_tensor(value: &serde_json::Value, dtype: &str) -> Result<NdArray> {
  let mut bytes = Vec::new();
  let mut shape = Vec::new();
  collect(value, dtype, 0, &mut shape, &mut bytes)?;
  Ok(NdArray {
    shape,
    dtype: dtype.to_string(),
    bytes,
  })
}

fn collect(
  value: &serde_json::Value,
  dtype: &str,
  depth: usize,
  shape: &mut Vec<usize>,
  out: &mut Vec<u8>,
) -> Result<()> {
  match value {
    serde_json::Value::Array(items) => {
      if shape.len() == depth {
        shape.push(items.len());
      } else if shape[depth] != items.len() {
        return Err(Error::shape_mismatch("ragged nested array cannot form a tensor"));
      }
      for item in items {
        collect(item, dtype, depth + 1, shape, out)?;
      }
      Ok(())
    }
    serde_json::Value::Number(n) => {
      let f = n
        .as_f64()
        .ok_or_else(|| Error::value_error("tensor element is not a finite number"))?;
      out.extend(encode_number(f, dtype)?);
      Ok(())
    }
    other => Err(Error::type_error(format!(
      "tensor elements must be numbers, got {}",
      other
    ))),
  }
}

fn encode_number(v: f64, dtype: &str) -> Result<Vec<u8>> {
  Ok(match dtype {
    "int8" => (v as i8).to_le_bytes().to_vec(),
    "int16" => (v as i16).to_le_bytes().to_vec(),
    "int32" => (v as i32).to_le_bytes().to_vec(),
    "int64" => (v as i64).to_le_bytes().to_vec(),
    "uint8" => (v as u8).to_le_bytes().to_vec(),
    "uint16" => (v as u16).to_le_bytes().to_vec(),
    "uint32" => (v as u32).to_le_bytes().to_vec(),
    "uint64" => (v as u64).to_le_bytes().to_vec(),
    "float32" => (v as f32).to_le_bytes().to_vec(),
    "float64" => v.to_le_bytes().to_vec(),
    other => return Err(Error::type_error(format!("unknown dtype: {}", other))),
  })
}
