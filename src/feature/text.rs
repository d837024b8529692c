//! UTF-8 text leaf: encode requires a `str`, decode requires valid
//! UTF-8.

use crate::codec::{Codec, Collaborators, DecodeInput};
use crate::error::{Error, Result};
use crate::value::Value;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Text;

impl Codec for Text {
  fn encode(&self, value: &Value, _collab: &Collaborators<'_>) -> Result<Vec<u8>> {
    match value.as_text() {
      Some(s) => Ok(s.as_bytes().to_vec()),
      None => Err(Error::type_error("Text expects a string value")),
    }
  }

  fn decode(&self, input: DecodeInput, _collab: &Collaborators<'_>) -> Result<Value> {
    match input.into_bytes()? {
      None => Ok(Value::Null),
      Some(bytes) => {
        let s = String::from_utf8(bytes)
          .map_err(|e| Error::type_error(format!("text is not valid UTF-8: {}", e)))?;
        Ok(Value::Text(s))
      }
    }
  }
}
