//! Partial shapes with unknown dimensions, used to validate tensor
//! values against their declared schema.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A single tensor dimension, which may be unknown.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dimension(Option<usize>);

impl Dimension {
  /// A known dimension of the given size.
  pub fn known(size: usize) -> Self {
    Dimension(Some(size))
  }

  /// An unknown dimension.
  pub fn unknown() -> Self {
    Dimension(None)
  }

  pub fn value(&self) -> Option<usize> {
    self.0
  }

  pub fn is_known(&self) -> bool {
    self.0.is_some()
  }

  /// Unknown dims are compatible with anything; two known dims are
  /// compatible only if equal. This is the "compatible unless proven
  /// otherwise" reading of an unknown dimension.
  pub fn is_compatible_with(&self, other: &Dimension) -> bool {
    match (self.0, other.0) {
      (Some(a), Some(b)) => a == b,
      _ => true,
    }
  }

  /// Replaces an unknown dimension with a known one from `other`; fails
  /// if both are known and disagree.
  pub fn merge_with(&self, other: &Dimension) -> Result<Dimension> {
    match (self.0, other.0) {
      (Some(a), Some(b)) if a != b => Err(Error::shape_mismatch(format!(
        "dimensions {} and {} are not compatible",
        a, b
      ))),
      (Some(a), _) => Ok(Dimension::known(a)),
      (None, other) => Ok(Dimension(other)),
    }
  }
}

impl From<usize> for Dimension {
  fn from(size: usize) -> Self {
    Dimension::known(size)
  }
}

impl From<Option<usize>> for Dimension {
  fn from(value: Option<usize>) -> Self {
    Dimension(value)
  }
}

impl std::fmt::Display for Dimension {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self.0 {
      Some(v) => write!(f, "{}", v),
      None => write!(f, "?"),
    }
  }
}

/// A tensor shape: either unknown rank, or an ordered sequence of
/// (possibly unknown) dimensions.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Shape {
  UnknownRank,
  Rank(Vec<Dimension>),
}

impl Shape {
  /// Constructs a fully-known shape from concrete sizes.
  pub fn known(dims: impl IntoIterator<Item = usize>) -> Self {
    Shape::Rank(dims.into_iter().map(Dimension::known).collect())
  }

  /// Constructs a shape from raw (possibly unknown) dims, `None` meaning
  /// unknown in that position.
  pub fn from_dims(dims: impl IntoIterator<Item = Option<usize>>) -> Self {
    Shape::Rank(dims.into_iter().map(Dimension::from).collect())
  }

  pub fn unknown_rank() -> Self {
    Shape::UnknownRank
  }

  /// An unknown shape of a known rank (every dim unknown).
  pub fn unknown_of_rank(rank: usize) -> Self {
    Shape::Rank(vec![Dimension::unknown(); rank])
  }

  pub fn rank(&self) -> Option<usize> {
    match self {
      Shape::UnknownRank => None,
      Shape::Rank(dims) => Some(dims.len()),
    }
  }

  pub fn dims(&self) -> Option<&[Dimension]> {
    match self {
      Shape::UnknownRank => None,
      Shape::Rank(dims) => Some(dims),
    }
  }

  pub fn is_fully_defined(&self) -> bool {
    matches!(self, Shape::Rank(dims) if dims.iter().all(Dimension::is_known))
  }

  /// Product of all dims; `None` if rank or any dim is unknown.
  pub fn num_elements(&self) -> Option<usize> {
    match self {
      Shape::UnknownRank => None,
      Shape::Rank(dims) => dims.iter().try_fold(1usize, |acc, d| Some(acc * d.value()?)),
    }
  }

  /// Pointwise compatibility: unknown rank is compatible with anything;
  /// known ranks must agree and be dimension-wise compatible.
  pub fn is_compatible_with(&self, other: &Shape) -> bool {
    match (self, other) {
      (Shape::UnknownRank, _) | (_, Shape::UnknownRank) => true,
      (Shape::Rank(a), Shape::Rank(b)) => {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.is_compatible_with(y))
      }
    }
  }

  pub fn assert_same_rank(&self, other: &Shape) -> Result<()> {
    if let (Some(a), Some(b)) = (self.rank(), other.rank()) {
      if a != b {
        return Err(Error::shape_mismatch(format!(
          "shapes must have the same rank, got {} and {}",
          a, b
        )));
      }
    }
    Ok(())
  }

  /// Replaces unknown dims with known ones from `other`; fails on a
  /// known-known conflict or a rank mismatch.
  pub fn merge_with(&self, other: &Shape) -> Result<Shape> {
    match (self, other) {
      (Shape::UnknownRank, other) => Ok(other.clone()),
      (this, Shape::UnknownRank) => Ok(this.clone()),
      (Shape::Rank(a), Shape::Rank(b)) => {
        self.assert_same_rank(other)?;
        let merged: Result<Vec<Dimension>> =
          a.iter().zip(b).map(|(x, y)| x.merge_with(y)).collect();
        Ok(Shape::Rank(merged?))
      }
    }
  }

  pub fn concatenate(&self, other: &Shape) -> Shape {
    match (self, other) {
      (Shape::Rank(a), Shape::Rank(b)) => {
        Shape::Rank(a.iter().chain(b).copied().collect())
      }
      _ => Shape::UnknownRank,
    }
  }
}

impl std::fmt::Display for Shape {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Shape::UnknownRank => write!(f, "<unknown>"),
      Shape::Rank(dims) => {
        write!(f, "(")?;
        for (i, d) in dims.iter().enumerate() {
          if i > 0 {
            write!(f, ", ")?;
          }
          write!(f, "{}", d)?;
        }
        write!(f, ")")
      }
    }
  }
}
