//! Encoded audio file leaf. Encode takes a path or a file-like object
//! and stores the file's raw bytes verbatim (it never decodes at
//! encode time); decode wraps the bytes in a lazily-decodable
//! `AudioDecoder`, deferring any DSP work until the caller actually
//! asks for samples.

use crate::codec::{Codec, Collaborators, DecodeInput};
use crate::error::{Error, Result};
use crate::shape::Shape;
use crate::value::Value;
use std::path::Path;

#[derive(Clone, Debug, PartialEq)]
pub struct Audio {
  pub shape: Shape,
  pub dtype: String,
  pub sample_rate: Option<u32>,
  pub lazy_decode: bool,
}

impl Audio {
  pub fn new(shape: Shape, dtype: impl Into<String>, sample_rate: Option<u32>) -> Self {
    Audio {
      shape,
      dtype: dtype.into(),
      sample_rate,
      lazy_decode: true,
    }
  }
}

impl Codec for Audio {
  fn encode(&self, value: &Value, _collab: &Collaborators<'_>) -> Result<Vec<u8>> {
    match value {
      Value::Text(path) => std::fs::read(Path::new(path))
        .map_err(|e| Error::value_error(format!("could not read audio file {}: {}", path, e))),
      Value::AudioBytes(bytes) => Ok(bytes.clone()),
      Value::Tensor(_) => Err(Error::value_error(
        "Audio must be a path or file-like object, not a raw array",
      )),
      _ => Err(Error::type_error(
        "Audio expects a file path or raw encoded bytes",
      )),
    }
  }

  fn decode(&self, input: DecodeInput, collab: &Collaborators<'_>) -> Result<Value> {
    match input.into_bytes()? {
      None => Ok(Value::Null),
      Some(bytes) => {
        let decoder = collab.audio.open(
          bytes,
          self.dtype.clone(),
          self.shape.clone(),
          self.sample_rate,
        );
        Ok(Value::AudioDecoder(decoder))
      }
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::codec::DefaultCollaborators;

  fn wav_bytes() -> Vec<u8> {
    let spec = hound::WavSpec {
      channels: 1,
      sample_rate: 8000,
      bits_per_sample: 16,
      sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
      let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
      for s in [0i16, 100, -100, 32767] {
        writer.write_sample(s).unwrap();
      }
      writer.finalize().unwrap();
    }
    cursor.into_inner()
  }

  #[test]
  fn encode_passes_raw_bytes_through() {
    let audio = Audio::new(Shape::unknown_of_rank(1), "float32", Some(8000));
    let collab = DefaultCollaborators::default();
    let bytes = wav_bytes();
    let encoded = audio
      .encode(&Value::AudioBytes(bytes.clone()), &collab.as_refs())
      .unwrap();
    assert_eq!(bytes, encoded);
  }

  #[test]
  fn encode_rejects_raw_arrays() {
    let audio = Audio::new(Shape::unknown_of_rank(1), "float32", Some(8000));
    let collab = DefaultCollaborators::default();
    let array = crate::collab::NdArray::from_array(
      ndarray::ArrayD::from_shape_vec(vec![2], vec![0.0f32, 1.0]).unwrap(),
    );
    assert!(audio
      .encode(&Value::Tensor(array), &collab.as_refs())
      .is_err());
  }

  #[test]
  fn decode_yields_a_lazy_decoder() {
    let audio = Audio::new(Shape::unknown_of_rank(1), "float32", Some(8000));
    let collab = DefaultCollaborators::default();
    let decoded = audio
      .decode(DecodeInput::Bytes(wav_bytes()), &collab.as_refs())
      .unwrap();
    match decoded {
      Value::AudioDecoder(mut decoder) => {
        let (samples, sample_rate) = decoder.read_all();
        assert_eq!(Some(4), samples.map(|s| s.len()));
        assert_eq!(Some(8000), sample_rate);
      }
      other => panic!("expected AudioDecoder, got {:?}", other),
    }
  }
}
