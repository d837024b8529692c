//! The leaf codec contract and the collaborator bundle leaf codecs are
//! given at encode/decode time.

use crate::collab::{
  ArrayReshape, AudioDecoderFactory, DefaultArrayReshape, DefaultAudioDecoderFactory,
  DefaultDtypeValidator, DtypeValidator,
};
use crate::error::Result;
use crate::stream::StreamHandle;
use crate::value::Value;
use std::io::Read;

/// What a leaf schema's `decode` is handed: either bytes already in
/// memory, or a stream it must fully read and close itself.
pub enum DecodeInput {
  Bytes(Vec<u8>),
  Stream(StreamHandle<Box<dyn Read>>),
}

impl DecodeInput {
  /// Resolves this input to its bytes. A stream input that reads zero
  /// bytes resolves to `None`, propagating missing data as a null value.
  /// Bytes handed directly are trusted as the caller's literal intent
  /// even if empty, e.g. an empty string; only streams get this
  /// treatment.
  pub fn into_bytes(self) -> Result<Option<Vec<u8>>> {
    match self {
      DecodeInput::Bytes(b) => Ok(Some(b)),
      DecodeInput::Stream(handle) => {
        let bytes = handle.read_to_end_and_close()?;
        Ok(if bytes.is_empty() { None } else { Some(bytes) })
      }
    }
  }
}

/// Every leaf feature's encode/decode pair, parameterized over the
/// external collaborators tensor/audio codecs need.
pub trait Codec {
  fn encode(&self, value: &Value, collab: &Collaborators<'_>) -> Result<Vec<u8>>;
  fn decode(&self, input: DecodeInput, collab: &Collaborators<'_>) -> Result<Value>;
}

/// Borrowed handles to the three external collaborators (see `collab.rs`).
pub struct Collaborators<'a> {
  pub dtype: &'a dyn DtypeValidator,
  pub reshape: &'a dyn ArrayReshape,
  pub audio: &'a dyn AudioDecoderFactory,
}

/// Owns the default collaborator implementations so callers who don't
/// have their own numeric-array/audio crate can still use this library
/// end to end.
pub struct DefaultCollaborators {
  dtype: DefaultDtypeValidator,
  reshape: DefaultArrayReshape,
  audio: DefaultAudioDecoderFactory,
}

impl Default for DefaultCollaborators {
  fn default() -> Self {
    DefaultCollaborators {
      dtype: DefaultDtypeValidator,
      reshape: DefaultArrayReshape::default(),
      audio: DefaultAudioDecoderFactory,
    }
  }
}

impl DefaultCollaborators {
  pub fn as_refs(&self) -> Collaborators<'_> {
    Collaborators {
      dtype: &self.dtype,
      reshape: &self.reshape,
      audio: &self.audio,
    }
  }
}
