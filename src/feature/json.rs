//! Arbitrary JSON leaf: a `Text` that additionally requires the string
//! to parse.

use crate::codec::{Codec, Collaborators, DecodeInput};
use crate::error::{Error, Result};
use crate::feature::text::Text;
use crate::value::Value;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Json;

impl Codec for Json {
  fn encode(&self, value: &Value, collab: &Collaborators<'_>) -> Result<Vec<u8>> {
    match value {
      Value::Json(v) => {
        let text = serde_json::to_string(v)
          .map_err(|e| Error::value_error(format!("could not serialize JSON value: {}", e)))?;
        Text.encode(&Value::Text(text), collab)
      }
      other => Text.encode(other, collab),
    }
  }

  fn decode(&self, input: DecodeInput, collab: &Collaborators<'_>) -> Result<Value> {
    match Text.decode(input, collab)? {
      Value::Null => Ok(Value::Null),
      Value::Text(s) => {
        let v = serde_json::from_str(&s)
          .map_err(|e| Error::value_error(format!("invalid JSON: {}", e)))?;
        Ok(Value::Json(v))
      }
      other => Ok(other),
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn collab() -> crate::codec::DefaultCollaborators {
    crate::codec::DefaultCollaborators::default()
  }

  #[test]
  fn round_trips_an_object() {
    let codec = Json;
    let c = collab();
    let value = Value::Json(serde_json::json!({"a": 1, "b": [true, null]}));
    let encoded = codec.encode(&value, &c.as_refs()).unwrap();
    let decoded = codec
      .decode(DecodeInput::Bytes(encoded), &c.as_refs())
      .unwrap();
    match decoded {
      Value::Json(v) => assert_eq!(serde_json::json!({"a": 1, "b": [true, null]}), v),
      other => panic!("expected Json, got {:?}", other),
    }
  }

  #[test]
  fn rejects_malformed_json() {
    let codec = Json;
    let c = collab();
    let decoded = codec.decode(DecodeInput::Bytes(b"{not json".to_vec()), &c.as_refs());
    assert!(decoded.is_err());
  }
}
