//! Schema-directed traversal between `Value` and the encoded/decoded
//! tree shapes, mutually recursive between mappings, lists, sequences
//! and leaves.

use crate::codec::{Collaborators, DecodeInput};
use crate::error::{Error, Result};
use crate::feature::{FeatureType, SequenceFeature};
use crate::tree::{Encoded, Tree};
use crate::value::Value;
use std::collections::BTreeMap;

/// What `tar::unpack` hands to `decode_nested`: the same tree shape as
/// `Encoded`, but with every leaf still an unread `DecodeInput`.
pub type DecodeTree = Tree<DecodeInput>;

/// Encodes a value against its schema into the tree `tar::pack` expects.
///
/// A `Value::Null` at *any* schema level short-circuits to a null leaf —
/// this reproduces the Python source's per-site `obj is not None else
/// None` guards (one centralized check here instead of one per branch,
/// since no branch there ever recurses into a schema with a `None`
/// value; they all substitute `None` before recursing).
pub fn encode_nested(schema: &FeatureType, value: &Value, collab: &Collaborators<'_>) -> Result<Encoded> {
  if value.is_null() {
    return Ok(Tree::Leaf(None));
  }

  match schema {
    FeatureType::Mapping(fields) => {
      let obj = value
        .as_struct()
        .ok_or_else(|| Error::type_error("expected a struct value for a mapping schema"))?;
      if fields.len() != obj.len() || !fields.keys().all(|k| obj.contains_key(k)) {
        return Err(Error::schema_mismatch(
          "value's key set does not match the mapping schema",
        ));
      }
      let mut out = BTreeMap::new();
      for (key, sub_schema) in fields {
        let sub_value = &obj[key];
        out.insert(key.clone(), encode_nested(sub_schema, sub_value, collab)?);
      }
      Ok(Tree::Mapping(out))
    }

    FeatureType::OrderedList(inner) => encode_list(inner, value, collab),

    FeatureType::Sequence(seq) => match seq.feature.as_ref() {
      SequenceFeature::Struct(fields) => {
        let obj = value
          .as_struct()
          .ok_or_else(|| Error::type_error("expected a struct value for a sequence-of-struct schema"))?;
        let mut out = BTreeMap::new();
        for (key, sub_schema) in fields {
          let column = obj
            .get(key)
            .ok_or_else(|| Error::schema_mismatch(format!("missing column `{}`", key)))?;
          out.insert(key.clone(), encode_list(sub_schema, column, collab)?);
        }
        Ok(Tree::Mapping(out))
      }
      SequenceFeature::Single(inner) => {
        if matches!(value, Value::Text(_)) {
          return Err(Error::type_error(
            "a Sequence of a non-struct feature cannot be a raw string",
          ));
        }
        encode_list(inner, value, collab)
      }
    },

    leaf => Ok(Tree::Leaf(Some(leaf.encode_leaf(value, collab)?))),
  }
}

/// The `OrderedList`/`Sequence`-of-non-struct shared tail: empty list
/// yields an empty list without ever touching the element schema.
fn encode_list(element_schema: &FeatureType, value: &Value, collab: &Collaborators<'_>) -> Result<Encoded> {
  let list = value
    .as_list()
    .ok_or_else(|| Error::type_error("expected a list value"))?;
  if list.is_empty() {
    return Ok(Tree::List(Vec::new()));
  }
  let items: Result<Vec<Encoded>> = list
    .iter()
    .map(|item| encode_nested(element_schema, item, collab))
    .collect();
  Ok(Tree::List(items?))
}

/// Decodes a tree back into a `Value` against its schema.
///
/// A bare leaf member under a composite schema is only ever the
/// null-subtree sentinel `pack` writes for a whole-subtree `None` (a
/// single zero-size file standing in for what would otherwise be a
/// directory); any other bytes there is a schema mismatch.
pub fn decode_nested(schema: &FeatureType, tree: DecodeTree, collab: &Collaborators<'_>) -> Result<Value> {
  if schema.is_leaf() {
    return match tree {
      Tree::Leaf(input) => schema.decode_leaf(input, collab),
      _ => Err(Error::schema_mismatch("expected a leaf member, found a composite")),
    };
  }

  if let Tree::Leaf(input) = tree {
    return match input.into_bytes()? {
      None => Ok(Value::Null),
      Some(bytes) => Err(Error::schema_mismatch(format!(
        "expected a composite member, found a non-empty leaf ({} bytes)",
        bytes.len()
      ))),
    };
  }

  match schema {
    FeatureType::Mapping(fields) => {
      let mut members = tree
        .into_mapping()
        .ok_or_else(|| Error::schema_mismatch("expected a directory member for a mapping schema"))?;
      if !members.keys().all(|k| fields.contains_key(k)) {
        return Err(Error::schema_mismatch(
          "archive member has a key not present in the mapping schema",
        ));
      }
      let mut out = BTreeMap::new();
      for (key, sub_schema) in fields {
        let value = match members.remove(key) {
          Some(sub_tree) => decode_nested(sub_schema, sub_tree, collab)?,
          None => empty_default(sub_schema)
            .ok_or_else(|| Error::schema_mismatch(format!("missing key `{}`", key)))?,
        };
        out.insert(key.clone(), value);
      }
      Ok(Value::Struct(out))
    }

    FeatureType::OrderedList(inner) => decode_list(inner, tree, collab),

    FeatureType::Sequence(seq) => match seq.feature.as_ref() {
      SequenceFeature::Struct(fields) => {
        let mut members = tree
          .into_mapping()
          .ok_or_else(|| Error::schema_mismatch("expected a directory member for a sequence-of-struct schema"))?;
        let mut out = BTreeMap::new();
        for (key, sub_schema) in fields {
          let value = match members.remove(key) {
            Some(column_tree) => decode_list(sub_schema, column_tree, collab)?,
            // A column with no items packs as an empty directory with no
            // file entries, indistinguishable on unpack from a column
            // that was never written at all.
            None => Value::List(Vec::new()),
          };
          out.insert(key.clone(), value);
        }
        // Always the struct-of-lists shape, never re-inverted to a list
        // of structs.
        Ok(Value::Struct(out))
      }
      SequenceFeature::Single(inner) => decode_list(inner, tree, collab),
    },

    _ => unreachable!("leaf schemas are handled above"),
  }
}

/// The value a key absent from an archive's directory member must decode
/// to, if its absence is explainable as "an empty list packs as a
/// directory with no file entries, indistinguishable from never having
/// been written." `None` means the key's absence is a genuine schema
/// mismatch.
fn empty_default(schema: &FeatureType) -> Option<Value> {
  match schema {
    FeatureType::OrderedList(_) => Some(Value::List(Vec::new())),
    FeatureType::Sequence(seq) => match seq.feature.as_ref() {
      SequenceFeature::Single(_) => Some(Value::List(Vec::new())),
      SequenceFeature::Struct(fields) => Some(Value::Struct(
        fields.keys().map(|k| (k.clone(), Value::List(Vec::new()))).collect(),
      )),
    },
    _ => None,
  }
}

fn decode_list(element_schema: &FeatureType, tree: DecodeTree, collab: &Collaborators<'_>) -> Result<Value> {
  let items = tree
    .into_list()
    .ok_or_else(|| Error::schema_mismatch("expected a list member"))?;
  let values: Result<Vec<Value>> = items
    .into_iter()
    .map(|item| decode_nested(element_schema, item, collab))
    .collect();
  Ok(Value::List(values?))
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::codec::DefaultCollaborators;
  use crate::feature::{Scalar, Text};
  use crate::shape::Shape;
  use std::io::Cursor;

  fn collab() -> DefaultCollaborators {
    DefaultCollaborators::default()
  }

  fn text_field(name: &str) -> (String, FeatureType) {
    (name.to_string(), FeatureType::Text(Text))
  }

  fn bytes_tree(tree: &Encoded) -> Option<Vec<u8>> {
    tree.as_leaf().cloned().flatten()
  }

  fn to_decode_tree(tree: Encoded) -> DecodeTree {
    match tree {
      Tree::Leaf(bytes) => Tree::Leaf(DecodeInput::Bytes(bytes.unwrap_or_default())),
      Tree::Mapping(m) => Tree::Mapping(
        m.into_iter()
          .map(|(k, v)| (k, to_decode_tree(v)))
          .collect(),
      ),
      Tree::List(items) => Tree::List(items.into_iter().map(to_decode_tree).collect()),
    }
  }

  #[test]
  fn encodes_and_decodes_a_flat_struct() {
    let mut fields = BTreeMap::new();
    let (k, v) = text_field("caption");
    fields.insert(k, v);
    let schema = FeatureType::Mapping(fields);
    let collab = collab();

    let mut obj = BTreeMap::new();
    obj.insert("caption".to_string(), Value::Text("a cat".into()));
    let value = Value::Struct(obj);

    let encoded = encode_nested(&schema, &value, &collab.as_refs()).unwrap();
    let decoded = decode_nested(&schema, to_decode_tree(encoded), &collab.as_refs()).unwrap();
    assert_eq!(Some("a cat"), decoded.as_struct().unwrap()["caption"].as_text());
  }

  #[test]
  fn null_short_circuits_at_any_level() {
    let schema = FeatureType::Mapping(BTreeMap::from([text_field("caption")]));
    let collab = collab();
    let encoded = encode_nested(&schema, &Value::Null, &collab.as_refs()).unwrap();
    assert_eq!(None, bytes_tree(&encoded));
    let decoded = decode_nested(&schema, to_decode_tree(encoded), &collab.as_refs()).unwrap();
    assert!(decoded.is_null());
  }

  #[test]
  fn empty_list_does_not_touch_element_schema() {
    let schema = FeatureType::OrderedList(Box::new(FeatureType::Scalar(Scalar::new("int64"))));
    let collab = collab();
    let encoded = encode_nested(&schema, &Value::List(Vec::new()), &collab.as_refs()).unwrap();
    assert!(matches!(encoded, Tree::List(ref v) if v.is_empty()));
  }

  #[test]
  fn list_with_a_leading_null_element_still_recurses_into_the_leaf() {
    let schema = FeatureType::OrderedList(Box::new(FeatureType::Text(Text)));
    let collab = collab();
    let value = Value::List(vec![Value::Null, Value::Text("b".into())]);
    let encoded = encode_nested(&schema, &value, &collab.as_refs()).unwrap();
    let items = encoded.into_list().unwrap();
    assert_eq!(None, items[0].as_leaf().cloned().flatten());
    assert!(items[1].as_leaf().cloned().flatten().is_some());
  }

  #[test]
  fn sequence_of_struct_always_decodes_to_a_struct_of_lists() {
    let fields = BTreeMap::from([text_field("token")]);
    let schema = FeatureType::Sequence(crate::feature::Sequence {
      feature: Box::new(SequenceFeature::Struct(fields)),
      length: -1,
    });
    let collab = collab();

    let mut col = BTreeMap::new();
    col.insert(
      "token".to_string(),
      Value::List(vec![Value::Text("a".into()), Value::Text("b".into())]),
    );
    let value = Value::Struct(col);

    let encoded = encode_nested(&schema, &value, &collab.as_refs()).unwrap();
    let decoded = decode_nested(&schema, to_decode_tree(encoded), &collab.as_refs()).unwrap();
    let out = decoded.as_struct().unwrap();
    let tokens = out["token"].as_list().unwrap();
    assert_eq!(2, tokens.len());
  }

  #[test]
  fn sequence_of_non_struct_rejects_raw_strings() {
    let schema = FeatureType::Sequence(crate::feature::Sequence {
      feature: Box::new(SequenceFeature::Single(Box::new(FeatureType::Text(Text)))),
      length: -1,
    });
    let collab = collab();
    let err = encode_nested(&schema, &Value::Text("not a list".into()), &collab.as_refs());
    assert!(err.is_err());
  }

  #[test]
  fn a_mapping_member_missing_an_empty_list_key_decodes_to_an_empty_list() {
    let schema = FeatureType::Mapping(BTreeMap::from([
      text_field("caption"),
      (
        "tags".to_string(),
        FeatureType::OrderedList(Box::new(FeatureType::Text(Text))),
      ),
    ]));
    let collab = collab();

    // The archive member for "tags" is absent entirely, the way an empty
    // list's directory entry (with no file children) unpacks.
    let tree: DecodeTree = Tree::Mapping(BTreeMap::from([(
      "caption".to_string(),
      Tree::Leaf(DecodeInput::Bytes(b"a cat".to_vec())),
    )]));

    let decoded = decode_nested(&schema, tree, &collab.as_refs()).unwrap();
    let out = decoded.as_struct().unwrap();
    assert_eq!(Some("a cat"), out["caption"].as_text());
    assert_eq!(Some(&[][..]), out["tags"].as_list());
  }

  #[test]
  fn a_mapping_member_missing_a_non_list_key_is_still_a_schema_mismatch() {
    let schema = FeatureType::Mapping(BTreeMap::from([text_field("caption"), text_field("title")]));
    let collab = collab();
    let tree: DecodeTree = Tree::Mapping(BTreeMap::from([(
      "caption".to_string(),
      Tree::Leaf(DecodeInput::Bytes(b"a cat".to_vec())),
    )]));
    assert!(decode_nested(&schema, tree, &collab.as_refs()).is_err());
  }

  #[test]
  fn a_composite_member_with_non_empty_bare_bytes_is_a_schema_mismatch() {
    let schema = FeatureType::Mapping(BTreeMap::from([text_field("caption")]));
    let collab = collab();
    let bogus = Tree::Leaf(DecodeInput::Bytes(vec![1, 2, 3]));
    assert!(decode_nested(&schema, bogus, &collab.as_refs()).is_err());
  }

  #[test]
  fn tensor_shape_mismatch_is_surfaced_through_nested_encode() {
    let schema = FeatureType::Tensor(crate::feature::Tensor::new(Shape::known(vec![3]), "float32"));
    let collab = collab();
    let array = crate::collab::NdArray::from_array(
      ndarray::ArrayD::from_shape_vec(vec![2], vec![0.0f32, 1.0]).unwrap(),
    );
    assert!(encode_nested(&schema, &Value::Tensor(array), &collab.as_refs()).is_err());
  }

  #[test]
  fn decode_input_stream_variant_used_by_unpack() {
    let schema = FeatureType::Text(Text);
    let collab = collab();
    let handle = crate::stream::StreamHandle::new(
      Box::new(Cursor::new(b"hi".to_vec())) as Box<dyn std::io::Read>,
      "leaf",
    );
    let tree: DecodeTree = Tree::Leaf(DecodeInput::Stream(handle));
    let value = decode_nested(&schema, tree, &collab.as_refs()).unwrap();
    assert_eq!(Some("hi"), value.as_text());
  }
}
