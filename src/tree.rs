//! The shape shared by an encoded record (on its way into a tar archive)
//! and a still-undecoded record (on its way out): a tree whose interior
//! nodes are mappings or ordered lists and whose leaves are a single
//! generic payload type `L`.
//!
//! Instantiated as `Tree<Option<Vec<u8>>>` between `nested::encode_nested`
//! and `tar::pack::pack`, and as `Tree<StreamHandle<...>>` between
//! `tar::unpack` and `nested::decode_nested`.

use std::collections::BTreeMap;

#[derive(Clone, Debug)]
pub enum Tree<L> {
  Leaf(L),
  Mapping(BTreeMap<String, Tree<L>>),
  List(Vec<Tree<L>>),
}

impl<L> Tree<L> {
  pub fn as_leaf(&self) -> Option<&L> {
    match self {
      Tree::Leaf(l) => Some(l),
      _ => None,
    }
  }

  pub fn into_leaf(self) -> Option<L> {
    match self {
      Tree::Leaf(l) => Some(l),
      _ => None,
    }
  }

  pub fn as_mapping(&self) -> Option<&BTreeMap<String, Tree<L>>> {
    match self {
      Tree::Mapping(m) => Some(m),
      _ => None,
    }
  }

  pub fn as_list(&self) -> Option<&[Tree<L>]> {
    match self {
      Tree::List(l) => Some(l),
      _ => None,
    }
  }

  pub fn into_mapping(self) -> Option<BTreeMap<String, Tree<L>>> {
    match self {
      Tree::Mapping(m) => Some(m),
      _ => None,
    }
  }

  pub fn into_list(self) -> Option<Vec<Tree<L>>> {
    match self {
      Tree::List(l) => Some(l),
      _ => None,
    }
  }
}

/// The encoded form of a record or a piece of one: byte-buffer leaves
/// (or `None` for a null value), with mapping/list interior nodes.
pub type Encoded = Tree<Option<Vec<u8>>>;
