//! `TarWriter`: schema-checked, duplicate-index-checked tar packing of
//! one record at a time into a single shard.

use crate::codec::Collaborators;
use crate::error::{Error, Result};
use crate::feature::Features;
use crate::nested::encode_nested;
use crate::tar::pack::pack;
use crate::value::Value;
use std::collections::BTreeSet;
use std::io::Write;

pub struct TarWriter<W: Write> {
  builder: tar::Builder<W>,
  schema: Features,
  written_indices: BTreeSet<String>,
}

impl<W: Write> TarWriter<W> {
  pub fn new(sink: W, schema: Features) -> Self {
    TarWriter {
      builder: tar::Builder::new(sink),
      schema,
      written_indices: BTreeSet::new(),
    }
  }

  /// Encodes and packs `record` under `index`. Returns the number of
  /// payload bytes written (directory entries excluded).
  pub fn write(&mut self, index: &str, record: &Value, collab: &Collaborators<'_>) -> Result<u64> {
    let fields = record
      .as_struct()
      .ok_or_else(|| Error::type_error("a record must be a struct"))?;
    if fields.len() != self.schema.0.len() || !self.schema.0.keys().all(|k| fields.contains_key(k)) {
      return Err(Error::schema_mismatch(
        "record's column set does not match the dataset schema",
      ));
    }
    if !self.written_indices.insert(index.to_string()) {
      return Err(Error::value_error(format!(
        "index {} already written",
        index
      )));
    }

    let schema_root = crate::feature::FeatureType::Mapping(self.schema.0.clone());
    let tree = encode_nested(&schema_root, record, collab)?;
    pack(&mut self.builder, index, &tree)
  }

  pub fn into_inner(self) -> Result<W> {
    Ok(self.builder.into_inner()?)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::codec::DefaultCollaborators;
  use crate::feature::{FeatureType, Text};
  use std::collections::BTreeMap;

  fn schema() -> Features {
    let mut fields = BTreeMap::new();
    fields.insert("caption".to_string(), FeatureType::Text(Text));
    Features::new(fields)
  }

  fn record(caption: &str) -> Value {
    let mut fields = BTreeMap::new();
    fields.insert("caption".to_string(), Value::Text(caption.to_string()));
    Value::Struct(fields)
  }

  #[test]
  fn writes_a_record_and_accounts_bytes() {
    let mut writer = TarWriter::new(Vec::new(), schema());
    let collab = DefaultCollaborators::default();
    let written = writer.write("0", &record("hello"), &collab.as_refs()).unwrap();
    assert_eq!(5, written);
  }

  #[test]
  fn rejects_a_duplicate_index() {
    let mut writer = TarWriter::new(Vec::new(), schema());
    let collab = DefaultCollaborators::default();
    writer.write("0", &record("a"), &collab.as_refs()).unwrap();
    assert!(writer.write("0", &record("b"), &collab.as_refs()).is_err());
  }

  #[test]
  fn rejects_a_record_with_the_wrong_columns() {
    let mut writer = TarWriter::new(Vec::new(), schema());
    let collab = DefaultCollaborators::default();
    let mut fields = BTreeMap::new();
    fields.insert("wrong_column".to_string(), Value::Text("x".into()));
    let bad_record = Value::Struct(fields);
    assert!(writer.write("0", &bad_record, &collab.as_refs()).is_err());
  }
}
