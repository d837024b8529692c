//! The sidecar manifest describing a dataset's schema and shard
//! inventory.

use crate::error::Result;
use crate::feature::Features;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DatasetInfo {
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub file_list: Vec<String>,
  #[serde(default)]
  pub features: Option<Features>,
  #[serde(default)]
  pub size_in_bytes: Option<u64>,
  #[serde(default)]
  pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl DatasetInfo {
  pub fn new(description: impl Into<String>) -> Self {
    DatasetInfo {
      description: description.into(),
      ..Default::default()
    }
  }

  pub fn to_json_pretty(&self) -> Result<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }

  pub fn from_json(s: &str) -> Result<Self> {
    Ok(serde_json::from_str(s)?)
  }

  pub fn write_to_json(&self, path: &Path) -> Result<()> {
    std::fs::write(path, self.to_json_pretty()?)?;
    Ok(())
  }

  pub fn from_json_file(path: &Path) -> Result<Self> {
    let text = std::fs::read_to_string(path)?;
    Self::from_json(&text)
  }

  /// Deep-merges `other` into `self`, skipping any field `other` leaves
  /// at its default/null value.
  pub fn update(&mut self, other: DatasetInfo) {
    if !other.description.is_empty() {
      self.description = other.description;
    }
    if !other.file_list.is_empty() {
      self.file_list = other.file_list;
    }
    if other.features.is_some() {
      self.features = other.features;
    }
    if other.size_in_bytes.is_some() {
      self.size_in_bytes = other.size_in_bytes;
    }
    if let Some(incoming) = other.metadata {
      match &mut self.metadata {
        Some(existing) => {
          for (k, v) in incoming {
            if !v.is_null() {
              existing.insert(k, v);
            }
          }
        }
        None => self.metadata = Some(incoming),
      }
    }
  }
}
