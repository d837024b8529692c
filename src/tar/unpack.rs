//! Lazily groups a tar archive's members by record index and reassembles
//! each group into the schema-directed tree `decode_nested` consumes:
//! a peek-based grouping pass over `std::iter::Peekable`, then a
//! conversion pass turning any all-digit-keyed map into a sorted list.

use crate::codec::DecodeInput;
use crate::error::{Error, Result};
use crate::stream::StreamHandle;
use crate::tree::Tree;
use std::collections::BTreeMap;
use std::io::Read;
use std::iter::Peekable;

use crate::nested::DecodeTree;

enum RawNode {
  Leaf(Vec<u8>),
  Mapping(BTreeMap<String, RawNode>),
}

fn insert(root: &mut BTreeMap<String, RawNode>, components: &[String], data: Vec<u8>) {
  if components.len() == 1 {
    root.insert(components[0].clone(), RawNode::Leaf(data));
    return;
  }
  let child = root
    .entry(components[0].clone())
    .or_insert_with(|| RawNode::Mapping(BTreeMap::new()));
  if let RawNode::Mapping(m) = child {
    insert(m, &components[1..], data);
  }
}

fn is_all_digit_map(map: &BTreeMap<String, RawNode>) -> bool {
  !map.is_empty() && map.keys().all(|k| !k.is_empty() && k.chars().all(|c| c.is_ascii_digit()))
}

fn transform<P: 'static>(node: RawNode, parent: &StreamHandle<P>) -> DecodeTree {
  match node {
    RawNode::Leaf(bytes) => Tree::Leaf(wrap_stream(bytes, parent)),
    RawNode::Mapping(map) => {
      if is_all_digit_map(&map) {
        let mut items: Vec<(u64, RawNode)> = map
          .into_iter()
          .map(|(k, v)| (k.parse().expect("checked all-digit above"), v))
          .collect();
        items.sort_by_key(|(i, _)| *i);
        Tree::List(items.into_iter().map(|(_, v)| transform(v, parent)).collect())
      } else {
        Tree::Mapping(
          map
            .into_iter()
            .map(|(k, v)| (k, transform(v, parent)))
            .collect(),
        )
      }
    }
  }
}

fn wrap_stream<P: 'static>(bytes: Vec<u8>, parent: &StreamHandle<P>) -> DecodeInput {
  let cursor: Box<dyn Read> = Box::new(std::io::Cursor::new(bytes));
  DecodeInput::Stream(StreamHandle::with_parent(cursor, parent, "member"))
}

/// Iterates `(index, tree)` pairs out of a tar archive's entries, one
/// per record. Every leaf in the yielded tree is parented to `parent`
/// (the shard's own stream handle), so closing the last record drawn
/// from a shard releases the shard's underlying reader if it was armed
/// with `autoclose()`.
pub struct TarMemberGroups<'a, R: Read, P> {
  entries: Peekable<tar::Entries<'a, R>>,
  parent: StreamHandle<P>,
}

impl<'a, R: Read, P: 'static> TarMemberGroups<'a, R, P> {
  pub fn new(entries: tar::Entries<'a, R>, parent: StreamHandle<P>) -> Self {
    TarMemberGroups {
      entries: entries.peekable(),
      parent,
    }
  }

  fn peek_index(&mut self) -> Option<Result<String>> {
    match self.entries.peek() {
      None => None,
      Some(Err(_)) => {
        let err = self.entries.next().unwrap().unwrap_err();
        Some(Err(Error::extract_error(err)))
      }
      Some(Ok(entry)) => match entry.path() {
        Ok(path) => path
          .components()
          .next()
          .map(|c| Ok(c.as_os_str().to_string_lossy().into_owned())),
        Err(e) => Some(Err(Error::extract_error(e))),
      },
    }
  }
}

impl<'a, R: Read, P: 'static> Iterator for TarMemberGroups<'a, R, P> {
  type Item = Result<(String, DecodeTree)>;

  fn next(&mut self) -> Option<Self::Item> {
    let index = match self.peek_index()? {
      Ok(index) => index,
      Err(e) => return Some(Err(e)),
    };

    let mut root: BTreeMap<String, RawNode> = BTreeMap::new();
    let mut bare_leaf: Option<Vec<u8>> = None;

    loop {
      let same_index = match self.entries.peek() {
        Some(Ok(entry)) => match entry.path() {
          Ok(path) => path
            .components()
            .next()
            .map(|c| c.as_os_str().to_string_lossy().as_ref() == index.as_str())
            .unwrap_or(false),
          Err(_) => true,
        },
        _ => false,
      };
      if !same_index {
        break;
      }

      let mut entry = match self.entries.next().unwrap() {
        Ok(entry) => entry,
        Err(e) => return Some(Err(Error::extract_error(e))),
      };

      if entry.header().entry_type().is_dir() {
        continue;
      }

      let components: Vec<String> = match entry.path() {
        Ok(path) => path
          .components()
          .skip(1)
          .map(|c| c.as_os_str().to_string_lossy().into_owned())
          .collect(),
        Err(e) => return Some(Err(Error::extract_error(e))),
      };

      let mut data = Vec::new();
      if let Err(e) = entry.read_to_end(&mut data) {
        return Some(Err(Error::extract_error(e)));
      }

      if components.is_empty() {
        bare_leaf = Some(data);
      } else {
        insert(&mut root, &components, data);
      }
    }

    let tree = match bare_leaf {
      Some(bytes) => Tree::Leaf(wrap_stream(bytes, &self.parent)),
      None => transform(RawNode::Mapping(root), &self.parent),
    };

    Some(Ok((index, tree)))
  }
}
