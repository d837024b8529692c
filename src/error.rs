//! Error kinds propagated to callers of this crate.
//!
//! The core is strict at boundaries and permissive internally: encoding
//! validates eagerly, decoding is lazy, and (with the sole exception of
//! audio decode failures, which are logged and materialized as a null
//! value rather than raised) no decode failure is swallowed.

use std::fmt;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure mode this crate can surface.
#[derive(thiserror::Error, Debug)]
pub enum Error {
  /// A record's column set (or a nested mapping's key set) doesn't match
  /// the schema it is being encoded or decoded against.
  #[error("schema mismatch: {0}")]
  SchemaMismatch(String),

  /// A tensor's realized dtype differs from its declared dtype.
  #[error("dtype mismatch: expected {expected}, got {actual}")]
  DTypeMismatch { expected: String, actual: String },

  /// A tensor's shape is incompatible with its declared shape.
  #[error("shape mismatch: {0}")]
  ShapeMismatch(String),

  /// A value had the wrong shape for its schema, e.g. a string where a
  /// list was required, or an invalid dtype token.
  #[error("type error: {0}")]
  TypeError(String),

  /// An otherwise-well-typed value was out of range, e.g. a negative
  /// audio read offset, or a structural conflict such as a duplicate
  /// shard index or a numeric struct field name.
  #[error("value error: {0}")]
  ValueError(String),

  /// A tar member could not be extracted from its archive.
  #[error("failed to extract tar member: {0}")]
  ExtractError(String),

  /// Underlying storage failure, surfaced as-is.
  #[error(transparent)]
  Io(#[from] std::io::Error),

  /// A manifest or leaf value failed to (de)serialize as JSON.
  #[error(transparent)]
  Json(#[from] serde_json::Error),
}

impl Error {
  pub fn schema_mismatch(msg: impl fmt::Display) -> Self {
    Error::SchemaMismatch(msg.to_string())
  }

  pub fn shape_mismatch(msg: impl fmt::Display) -> Self {
    Error::ShapeMismatch(msg.to_string())
  }

  pub fn type_error(msg: impl fmt::Display) -> Self {
    Error::TypeError(msg.to_string())
  }

  pub fn value_error(msg: impl fmt::Display) -> Self {
    Error::ValueError(msg.to_string())
  }

  pub fn extract_error(msg: impl fmt::Display) -> Self {
    Error::ExtractError(msg.to_string())
  }
}
