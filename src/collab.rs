//! Seams for the three external collaborators this crate consumes from
//! but does not own: dtype validation, raw-bytes-to-N-dimensional-array
//! reshaping, and audio decoding. A deployment with its own numeric-array
//! or audio-decoding crate swaps in its own implementation of these
//! traits; the defaults here exist so the crate is usable and testable
//! standalone.

use crate::error::{Error, Result};
use crate::shape::Shape;
use std::io::Cursor;

/// Validates dtype tokens and reports their on-disk byte width.
pub trait DtypeValidator: Send + Sync {
  fn is_valid(&self, dtype: &str) -> bool;
  fn byte_width(&self, dtype: &str) -> Option<usize>;
}

/// Reshapes a raw little-endian byte buffer into a typed N-D array.
pub trait ArrayReshape: Send + Sync {
  fn reshape(&self, bytes: &[u8], dtype: &str, shape: &Shape) -> Result<NdArray>;
}

/// An owned N-D array: a flat little-endian byte buffer plus the shape
/// and dtype it should be interpreted under. Kept dtype-generic (rather
/// than a `ndarray::ArrayD<T>` for a single `T`) because a schema's
/// dtype is only known at runtime.
#[derive(Clone, Debug, PartialEq)]
pub struct NdArray {
  pub shape: Vec<usize>,
  pub dtype: String,
  pub bytes: Vec<u8>,
}

impl NdArray {
  pub fn num_elements(&self) -> usize {
    self.shape.iter().product()
  }

  /// Builds an `NdArray` from a typed `ndarray::ArrayD<T>`, row-major.
  pub fn from_array<T: NdElement>(array: ndarray::ArrayD<T>) -> Self {
    let shape = array.shape().to_vec();
    let bytes = array
      .into_raw_vec()
      .into_iter()
      .flat_map(|v| v.to_le_bytes())
      .collect();
    NdArray {
      shape,
      dtype: T::DTYPE.to_string(),
      bytes,
    }
  }

  /// Reinterprets this array's bytes as a typed `ndarray::ArrayD<T>`.
  /// Fails if `T`'s dtype doesn't match the array's declared dtype.
  pub fn to_array<T: NdElement>(&self) -> Result<ndarray::ArrayD<T>> {
    if self.dtype != T::DTYPE {
      return Err(Error::DTypeMismatch {
        expected: self.dtype.clone(),
        actual: T::DTYPE.to_string(),
      });
    }
    let width = T::WIDTH;
    let elements: Vec<T> = self
      .bytes
      .chunks_exact(width)
      .map(T::from_le_bytes)
      .collect();
    ndarray::ArrayD::from_shape_vec(self.shape.clone(), elements)
      .map_err(|e| Error::shape_mismatch(e.to_string()))
  }
}

/// A numeric element type this crate knows how to flatten to/from raw
/// little-endian bytes. Implemented for the dtypes `DefaultDtypeValidator`
/// accepts.
pub trait NdElement: Copy + 'static {
  const DTYPE: &'static str;
  const WIDTH: usize;
  fn to_le_bytes(self) -> Vec<u8>;
  fn from_le_bytes(bytes: &[u8]) -> Self;
}

macro_rules! impl_nd_element {
  ($t:ty, $dtype:expr, $width:expr) => {
    impl NdElement for $t {
      const DTYPE: &'static str = $dtype;
      const WIDTH: usize = $width;

      fn to_le_bytes(self) -> Vec<u8> {
        <$t>::to_le_bytes(self).to_vec()
      }

      fn from_le_bytes(bytes: &[u8]) -> Self {
        let mut buf = [0u8; $width];
        buf.copy_from_slice(bytes);
        <$t>::from_le_bytes(buf)
      }
    }
  };
}

impl_nd_element!(i8, "int8", 1);
impl_nd_element!(i16, "int16", 2);
impl_nd_element!(i32, "int32", 4);
impl_nd_element!(i64, "int64", 8);
impl_nd_element!(u8, "uint8", 1);
impl_nd_element!(u16, "uint16", 2);
impl_nd_element!(u32, "uint32", 4);
impl_nd_element!(u64, "uint64", 8);
impl_nd_element!(f32, "float32", 4);
impl_nd_element!(f64, "float64", 8);

/// Known-dtype table; the stand-in for an external numeric-array
/// crate's dtype registry.
#[derive(Default)]
pub struct DefaultDtypeValidator;

impl DtypeValidator for DefaultDtypeValidator {
  fn is_valid(&self, dtype: &str) -> bool {
    self.byte_width(dtype).is_some()
  }

  fn byte_width(&self, dtype: &str) -> Option<usize> {
    match dtype {
      "int8" | "uint8" | "bool" => Some(1),
      "int16" | "uint16" => Some(2),
      "int32" | "uint32" | "float32" => Some(4),
      "int64" | "uint64" | "float64" => Some(8),
      _ => None,
    }
  }
}

/// Reshapes raw bytes using the dtype's byte width, mirroring
/// `np.frombuffer(...).reshape(shape)` with at most one unknown
/// ("-1") dimension.
pub struct DefaultArrayReshape<V: DtypeValidator = DefaultDtypeValidator> {
  validator: V,
}

impl Default for DefaultArrayReshape {
  fn default() -> Self {
    DefaultArrayReshape {
      validator: DefaultDtypeValidator,
    }
  }
}

impl<V: DtypeValidator> DefaultArrayReshape<V> {
  pub fn new(validator: V) -> Self {
    DefaultArrayReshape { validator }
  }
}

impl<V: DtypeValidator> ArrayReshape for DefaultArrayReshape<V> {
  fn reshape(&self, bytes: &[u8], dtype: &str, shape: &Shape) -> Result<NdArray> {
    let width = self
      .validator
      .byte_width(dtype)
      .ok_or_else(|| Error::type_error(format!("invalid dtype: {}", dtype)))?;
    if bytes.len() % width != 0 {
      return Err(Error::shape_mismatch(format!(
        "byte buffer of length {} is not a multiple of dtype width {}",
        bytes.len(),
        width
      )));
    }
    let total_elements = bytes.len() / width;

    let dims = shape
      .dims()
      .ok_or_else(|| Error::shape_mismatch("cannot reshape into an unknown-rank shape"))?;

    let unknown_count = dims.iter().filter(|d| !d.is_known()).count();
    if unknown_count > 1 {
      return Err(Error::shape_mismatch(
        "at most one unknown dimension is allowed when reshaping",
      ));
    }

    let known_product: usize = dims.iter().filter_map(|d| d.value()).product();
    let resolved: Vec<usize> = if unknown_count == 1 {
      if known_product == 0 || total_elements % known_product != 0 {
        return Err(Error::shape_mismatch(format!(
          "cannot infer unknown dimension: {} elements do not divide evenly by {}",
          total_elements, known_product
        )));
      }
      let inferred = total_elements / known_product;
      dims.iter().map(|d| d.value().unwrap_or(inferred)).collect()
    } else {
      if known_product != total_elements {
        return Err(Error::shape_mismatch(format!(
          "expected {} elements for shape, got {}",
          known_product, total_elements
        )));
      }
      dims.iter().map(|d| d.value().unwrap()).collect()
    };

    Ok(NdArray {
      shape: resolved,
      dtype: dtype.to_string(),
      bytes: bytes.to_vec(),
    })
  }
}

/// Decoded audio samples, or `(None, None)` on a decode failure (never
/// raised as an error — see `Error`'s docs).
pub type AudioSamples = (Option<Vec<f32>>, Option<u32>);

/// A handle bound to an in-memory audio file that can be decoded lazily,
/// in whole or in a time range.
pub trait AudioDecoder {
  fn read_all(&mut self) -> AudioSamples;
  fn read_range(&mut self, start_sec: f64, end_sec: f64) -> Result<AudioSamples>;
}

/// Constructs an `AudioDecoder` bound to the encoded file's bytes.
pub trait AudioDecoderFactory: Send + Sync {
  fn open(
    &self,
    bytes: Vec<u8>,
    dtype: String,
    shape: Shape,
    sample_rate: Option<u32>,
  ) -> Box<dyn AudioDecoder>;
}

/// Default factory, backed by `hound`; understands WAV only. Anything
/// else yields a decoder whose reads always produce `(None, None)`.
#[derive(Default)]
pub struct DefaultAudioDecoderFactory;

impl AudioDecoderFactory for DefaultAudioDecoderFactory {
  fn open(
    &self,
    bytes: Vec<u8>,
    _dtype: String,
    _shape: Shape,
    sample_rate: Option<u32>,
  ) -> Box<dyn AudioDecoder> {
    Box::new(WavAudioDecoder {
      bytes,
      declared_sample_rate: sample_rate,
    })
  }
}

struct WavAudioDecoder {
  bytes: Vec<u8>,
  declared_sample_rate: Option<u32>,
}

impl WavAudioDecoder {
  fn decode_samples(&self) -> Option<(Vec<f32>, u32)> {
    let cursor = Cursor::new(self.bytes.clone());
    let mut reader = hound::WavReader::new(cursor).ok()?;
    let spec = reader.spec();
    let sample_rate = self.declared_sample_rate.unwrap_or(spec.sample_rate);
    let samples: std::result::Result<Vec<f32>, _> = match spec.sample_format {
      hound::SampleFormat::Float => reader.samples::<f32>().collect(),
      hound::SampleFormat::Int => {
        let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
        reader
          .samples::<i32>()
          .map(|s| s.map(|v| v as f32 / max))
          .collect()
      }
    };
    samples.ok().map(|s| (s, sample_rate))
  }
}

impl AudioDecoder for WavAudioDecoder {
  fn read_all(&mut self) -> AudioSamples {
    match self.decode_samples() {
      Some((samples, sample_rate)) => (Some(samples), Some(sample_rate)),
      None => {
        log::error!("error reading audio: could not decode WAV stream");
        (None, None)
      }
    }
  }

  fn read_range(&mut self, start_sec: f64, end_sec: f64) -> Result<AudioSamples> {
    if start_sec < 0.0 {
      return Err(Error::value_error(format!(
        "start must be >= 0, got {}",
        start_sec
      )));
    }
    if end_sec < start_sec {
      return Err(Error::value_error(format!(
        "end must be >= start, got {} < {}",
        end_sec, start_sec
      )));
    }
    match self.decode_samples() {
      Some((samples, sample_rate)) => {
        let start_idx = (start_sec * sample_rate as f64) as usize;
        let end_idx = ((end_sec * sample_rate as f64) as usize).min(samples.len());
        let slice = if start_idx < end_idx {
          samples[start_idx..end_idx].to_vec()
        } else {
          Vec::new()
        };
        Ok((Some(slice), Some(sample_rate)))
      }
      None => {
        log::error!("error reading audio: could not decode WAV stream");
        Ok((None, None))
      }
    }
  }
}
