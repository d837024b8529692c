//! Writes one record's encoded tree into a tar archive under its index
//! path, using the `tar` crate's `Builder`/`Header` API to lay out
//! directory entries for composite nodes and file entries for leaves.

use crate::error::{Error, Result};
use crate::tree::{Encoded, Tree};
use std::io::Write;

/// Writes `tree` under `index` (the record's path prefix) and returns
/// the number of content bytes written, for the shard writer's byte
/// budget.
pub fn pack<W: Write>(builder: &mut tar::Builder<W>, index: &str, tree: &Encoded) -> Result<u64> {
  write_node(builder, index, tree)
}

fn write_node<W: Write>(builder: &mut tar::Builder<W>, path: &str, tree: &Encoded) -> Result<u64> {
  match tree {
    Tree::Leaf(None) => {
      write_file(builder, path, &[])?;
      Ok(0)
    }
    Tree::Leaf(Some(bytes)) => {
      write_file(builder, path, bytes)?;
      Ok(bytes.len() as u64)
    }
    Tree::Mapping(fields) => {
      for key in fields.keys() {
        if !key.is_empty() && key.chars().all(|c| c.is_ascii_digit()) {
          return Err(Error::value_error(format!(
            "struct field name `{}` cannot be all-digit: reserved for list-index encoding",
            key
          )));
        }
      }
      write_dir(builder, path)?;
      let mut total = 0u64;
      for (key, sub_tree) in fields {
        total += write_node(builder, &format!("{}/{}", path, key), sub_tree)?;
      }
      Ok(total)
    }
    Tree::List(items) => {
      write_dir(builder, path)?;
      let mut total = 0u64;
      for (i, sub_tree) in items.iter().enumerate() {
        total += write_node(builder, &format!("{}/{}", path, i), sub_tree)?;
      }
      Ok(total)
    }
  }
}

fn write_dir<W: Write>(builder: &mut tar::Builder<W>, path: &str) -> Result<()> {
  let mut header = tar::Header::new_gnu();
  header.set_path(format!("{}/", path))?;
  header.set_entry_type(tar::EntryType::Directory);
  header.set_size(0);
  header.set_mode(0o755);
  header.set_cksum();
  builder.append(&header, std::io::empty())?;
  Ok(())
}

fn write_file<W: Write>(builder: &mut tar::Builder<W>, path: &str, bytes: &[u8]) -> Result<()> {
  let mut header = tar::Header::new_gnu();
  header.set_path(path)?;
  header.set_entry_type(tar::EntryType::Regular);
  header.set_size(bytes.len() as u64);
  header.set_mode(0o644);
  header.set_cksum();
  builder.append(&header, bytes)?;
  Ok(())
}
