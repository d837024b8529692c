//! Sharded tar packaging of typed, schema-described records.
//!
//! A `Features` schema describes a record's columns; `ShardWriter` packs
//! a stream of records into size- or count-bounded tar shards alongside
//! a `DatasetInfo` manifest; `TarReader` reads them back, decoding each
//! leaf value lazily against the same schema.

pub mod codec;
pub mod collab;
pub mod error;
pub mod feature;
pub mod manifest;
pub mod nested;
pub mod reader;
pub mod shape;
pub mod shard;
pub mod stream;
pub mod tar;
pub mod tree;
pub mod value;
pub mod writer;

pub use codec::{Codec, Collaborators, DecodeInput, DefaultCollaborators};
pub use collab::{
  ArrayReshape, AudioDecoder, AudioDecoderFactory, AudioSamples, DefaultArrayReshape,
  DefaultAudioDecoderFactory, DefaultDtypeValidator, DtypeValidator, NdArray, NdElement,
};
pub use error::{Error, Result};
pub use feature::{Audio, Features, FeatureType, Json, Scalar, Sequence, SequenceFeature, Tensor, Text};
pub use manifest::DatasetInfo;
pub use nested::{decode_nested, encode_nested, DecodeTree};
pub use reader::TarReader;
pub use shape::Shape;
pub use shard::ShardWriter;
pub use stream::StreamHandle;
pub use tree::{Encoded, Tree};
pub use value::Value;
pub use writer::TarWriter;
