use std::collections::BTreeMap;
use tarfeatures::{
  DatasetInfo, DefaultCollaborators, Features, FeatureType, Json, NdArray, Scalar, Sequence,
  SequenceFeature, Shape, ShardWriter, TarReader, TarWriter, Tensor, Text, Value,
};

fn text_schema() -> Features {
  let mut fields = BTreeMap::new();
  fields.insert("text".to_string(), FeatureType::Text(Text));
  Features::new(fields)
}

fn text_record(s: &str) -> Value {
  let mut fields = BTreeMap::new();
  fields.insert("text".to_string(), Value::Text(s.to_string()));
  Value::Struct(fields)
}

#[test]
fn s1_text_single_column() {
  let collab = DefaultCollaborators::default();

  let mut writer = TarWriter::new(Vec::new(), text_schema());
  for (i, word) in ["hello_0", "hello_1", "hello_2"].iter().enumerate() {
    writer.write(&i.to_string(), &text_record(word), &collab.as_refs()).unwrap();
  }
  let archive = writer.into_inner().unwrap();
  let mut reader = tar::Archive::new(archive.as_slice());
  let paths: Vec<String> = reader
    .entries()
    .unwrap()
    .map(|e| {
      e.unwrap()
        .path()
        .unwrap()
        .to_string_lossy()
        .trim_end_matches('/')
        .to_string()
    })
    .collect();
  assert_eq!(vec!["0", "0/text", "1", "1/text", "2", "2/text"], paths);

  let dir = tempfile::tempdir().unwrap();
  let mut manifest = DatasetInfo::new("s1");
  manifest.features = Some(text_schema());
  let mut shard = ShardWriter::new(dir.path(), manifest, "%05d", 1000, u64::MAX).unwrap();
  for word in ["hello_0", "hello_1", "hello_2"] {
    shard.write(&text_record(word), &collab.as_refs()).unwrap();
  }
  shard.close().unwrap();

  let reader = TarReader::from_manifest(&dir.path().join("dataset_info.json")).unwrap();
  let records: Vec<_> = reader.iter().map(|r| r.unwrap()).collect();
  assert_eq!(3, records.len());
  for (i, (_, index, record)) in records.iter().enumerate() {
    assert_eq!(i.to_string(), *index);
    let expected = format!("hello_{}", i);
    assert_eq!(Some(expected.as_str()), record.as_struct().unwrap()["text"].as_text());
  }
}

#[test]
fn s2_tensor() {
  let collab = DefaultCollaborators::default();
  let mut fields = BTreeMap::new();
  fields.insert(
    "x".to_string(),
    FeatureType::Tensor(Tensor::new(Shape::known(vec![3, 4]), "float32")),
  );
  let schema = Features::new(fields);

  let values: Vec<f32> = (0..12).map(|i| i as f32 * 0.5).collect();
  let array = ndarray::ArrayD::from_shape_vec(vec![3, 4], values.clone()).unwrap();
  let mut record_fields = BTreeMap::new();
  record_fields.insert("x".to_string(), Value::Tensor(NdArray::from_array(array)));
  let record = Value::Struct(record_fields);

  let dir = tempfile::tempdir().unwrap();
  let mut manifest = DatasetInfo::new("s2");
  manifest.features = Some(schema);
  let mut shard = ShardWriter::new(dir.path(), manifest, "%05d", 10, u64::MAX).unwrap();
  shard.write(&record, &collab.as_refs()).unwrap();
  shard.close().unwrap();

  let reader = TarReader::from_manifest(&dir.path().join("dataset_info.json")).unwrap();
  let (_, _, decoded) = reader.iter().next().unwrap().unwrap();
  match &decoded.as_struct().unwrap()["x"] {
    Value::Tensor(nd) => {
      let back: ndarray::ArrayD<f32> = nd.to_array().unwrap();
      assert_eq!(ndarray::ArrayD::from_shape_vec(vec![3, 4], values).unwrap(), back);
    }
    other => panic!("expected Tensor, got {:?}", other),
  }
}

#[test]
fn s3_json() {
  let collab = DefaultCollaborators::default();
  let mut fields = BTreeMap::new();
  fields.insert("j".to_string(), FeatureType::Json(Json));
  let schema = Features::new(fields);

  let mut record_fields = BTreeMap::new();
  record_fields.insert("j".to_string(), Value::Json(serde_json::json!({"a": 1, "b": 2})));
  let record = Value::Struct(record_fields);

  let dir = tempfile::tempdir().unwrap();
  let mut manifest = DatasetInfo::new("s3");
  manifest.features = Some(schema);
  let mut shard = ShardWriter::new(dir.path(), manifest, "%05d", 10, u64::MAX).unwrap();
  shard.write(&record, &collab.as_refs()).unwrap();
  shard.close().unwrap();

  let reader = TarReader::from_manifest(&dir.path().join("dataset_info.json")).unwrap();
  let (_, _, decoded) = reader.iter().next().unwrap().unwrap();
  match &decoded.as_struct().unwrap()["j"] {
    Value::Json(v) => assert_eq!(serde_json::json!({"a": 1, "b": 2}), *v),
    other => panic!("expected Json, got {:?}", other),
  }
}

#[test]
fn s4_sequence_of_struct() {
  let collab = DefaultCollaborators::default();

  let mut struct_fields = BTreeMap::new();
  struct_fields.insert("text".to_string(), FeatureType::Text(Text));
  struct_fields.insert("upvotes".to_string(), FeatureType::Scalar(Scalar::new("int32")));
  let seq = Sequence {
    feature: Box::new(SequenceFeature::Struct(struct_fields)),
    length: -1,
  };
  let mut fields = BTreeMap::new();
  fields.insert("posts".to_string(), FeatureType::Sequence(seq));
  let schema = Features::new(fields);

  let mut posts_fields = BTreeMap::new();
  posts_fields.insert(
    "text".to_string(),
    Value::List(vec![Value::Text("x".into()), Value::Text("y".into())]),
  );
  posts_fields.insert(
    "upvotes".to_string(),
    Value::List(vec![Value::Json(serde_json::json!(1)), Value::Json(serde_json::json!(2))]),
  );
  let mut record_fields = BTreeMap::new();
  record_fields.insert("posts".to_string(), Value::Struct(posts_fields));
  let record = Value::Struct(record_fields);

  let dir = tempfile::tempdir().unwrap();
  let mut manifest = DatasetInfo::new("s4");
  manifest.features = Some(schema);
  let mut shard = ShardWriter::new(dir.path(), manifest, "%05d", 10, u64::MAX).unwrap();
  shard.write(&record, &collab.as_refs()).unwrap();
  shard.close().unwrap();

  let reader = TarReader::from_manifest(&dir.path().join("dataset_info.json")).unwrap();
  let (_, _, decoded) = reader.iter().next().unwrap().unwrap();
  let posts = decoded.as_struct().unwrap()["posts"].as_struct().unwrap();

  let texts: Vec<&str> = posts["text"].as_list().unwrap().iter().map(|v| v.as_text().unwrap()).collect();
  assert_eq!(vec!["x", "y"], texts);

  let upvotes: Vec<i32> = posts["upvotes"]
    .as_list()
    .unwrap()
    .iter()
    .map(|v| match v {
      Value::Tensor(nd) => nd.to_array::<i32>().unwrap().into_raw_vec()[0],
      other => panic!("expected Tensor, got {:?}", other),
    })
    .collect();
  assert_eq!(vec![1, 2], upvotes);
}

#[test]
fn s5_shard_rolling() {
  let _ = env_logger::builder().is_test(true).try_init();
  let collab = DefaultCollaborators::default();
  let dir = tempfile::tempdir().unwrap();
  let mut manifest = DatasetInfo::new("s5");
  manifest.features = Some(text_schema());
  let mut shard = ShardWriter::new(dir.path(), manifest, "%05d", 1000, u64::MAX).unwrap();
  for i in 0..2500 {
    shard.write(&text_record(&format!("row_{}", i)), &collab.as_refs()).unwrap();
  }
  let info = shard.close().unwrap();
  assert_eq!(3, info.file_list.len());

  let reader = TarReader::from_manifest(&dir.path().join("dataset_info.json")).unwrap();
  let total = reader.iter().map(|r| r.unwrap()).count();
  assert_eq!(2500, total);
}

#[test]
fn s6_dataset_info_round_trip() {
  let mut manifest = DatasetInfo::new("s6");
  manifest.features = Some(text_schema());
  let mut metadata = serde_json::Map::new();
  metadata.insert("key".to_string(), serde_json::Value::String("value".to_string()));
  manifest.metadata = Some(metadata);

  let json = manifest.to_json_pretty().unwrap();
  let back = DatasetInfo::from_json(&json).unwrap();
  assert_eq!(manifest, back);
}
