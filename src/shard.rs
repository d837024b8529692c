//! `ShardWriter`: rolls tar shards by entry count or byte budget while
//! keeping the manifest's `file_list` and running byte total current.

use crate::codec::Collaborators;
use crate::error::Result;
use crate::manifest::DatasetInfo;
use crate::value::Value;
use crate::writer::TarWriter;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Renders a `printf`-style `%0Nd` shard index pattern (e.g. `%05d`)
/// against a shard number. Anything else in the pattern passes through
/// literally.
fn format_shard_name(pattern: &str, n: u64) -> String {
  if let Some(pct) = pattern.find('%') {
    let rest = &pattern[pct + 1..];
    let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    if rest[digits_end..].starts_with('d') {
      let width: usize = rest[..digits_end].parse().unwrap_or(0);
      let rendered = format!("{:0width$}", n, width = width);
      return format!("{}{}{}", &pattern[..pct], rendered, &rest[digits_end + 1..]);
    }
  }
  format!("{}{}", pattern, n)
}

pub struct ShardWriter {
  directory: PathBuf,
  manifest: DatasetInfo,
  index_pattern: String,
  max_count: u64,
  max_size: u64,
  current: Option<TarWriter<File>>,
  current_name: Option<String>,
  count: u64,
  byte_tally: u64,
  shard_counter: u64,
  total_count: u64,
}

impl ShardWriter {
  pub fn new(
    directory: impl Into<PathBuf>,
    manifest: DatasetInfo,
    index_pattern: impl Into<String>,
    max_count: u64,
    max_size: u64,
  ) -> Result<Self> {
    let directory = directory.into();
    std::fs::create_dir_all(&directory)?;
    Ok(ShardWriter {
      directory,
      manifest,
      index_pattern: index_pattern.into(),
      max_count,
      max_size,
      current: None,
      current_name: None,
      count: 0,
      byte_tally: 0,
      shard_counter: 0,
      total_count: 0,
    })
  }

  fn needs_roll(&self) -> bool {
    self.current.is_none() || self.count >= self.max_count || self.byte_tally > self.max_size
  }

  fn roll(&mut self) -> Result<()> {
    self.seal_current()?;
    let name = format!("{}.tar", format_shard_name(&self.index_pattern, self.shard_counter));
    let path = self.directory.join(&name);
    let file = File::create(&path)?;
    let schema = self
      .manifest
      .features
      .clone()
      .unwrap_or_else(|| crate::feature::Features::new(Default::default()));
    self.current = Some(TarWriter::new(file, schema));
    self.current_name = Some(name);
    self.shard_counter += 1;
    self.count = 0;
    self.byte_tally = 0;
    Ok(())
  }

  fn seal_current(&mut self) -> Result<()> {
    if let Some(writer) = self.current.take() {
      writer.into_inner()?;
      if let Some(name) = self.current_name.take() {
        self.manifest.file_list.push(name);
      }
    }
    Ok(())
  }

  pub fn write(&mut self, record: &Value, collab: &Collaborators<'_>) -> Result<()> {
    if self.needs_roll() {
      self.roll()?;
    }
    let index = self.count.to_string();
    let written = self
      .current
      .as_mut()
      .expect("just rolled a shard")
      .write(&index, record, collab)?;
    self.byte_tally += written;
    self.count += 1;
    self.total_count += 1;
    Ok(())
  }

  /// Flushes the current shard, appends its basename, writes
  /// `dataset_info.json` pretty-printed, and returns the final manifest.
  pub fn close(mut self) -> Result<DatasetInfo> {
    self.seal_current()?;
    log::info!("{} examples written across {} shards", self.total_count, self.manifest.file_list.len());
    let path = self.directory.join("dataset_info.json");
    self.manifest.write_to_json(&path)?;
    Ok(self.manifest)
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }
}
