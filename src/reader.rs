//! `TarReader`: opens a dataset's shards in manifest order, auto-detects
//! gzip compression, and yields decoded records lazily.

use crate::codec::Collaborators;
use crate::collab::{ArrayReshape, AudioDecoderFactory, DtypeValidator};
use crate::error::Result;
use crate::feature::{Features, FeatureType};
use crate::manifest::DatasetInfo;
use crate::nested::{decode_nested, DecodeTree};
use crate::stream::StreamHandle;
use crate::tar::unpack::TarMemberGroups;
use crate::value::Value;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

fn open_shard(path: &Path) -> Result<StreamHandle<Box<dyn Read>>> {
  let mut file = File::open(path)?;
  let mut magic = [0u8; 2];
  let read = file.read(&mut magic)?;
  file.seek(SeekFrom::Start(0))?;
  let reader: Box<dyn Read> = if read == 2 && magic == GZIP_MAGIC {
    Box::new(flate2::read::GzDecoder::new(file))
  } else {
    Box::new(file)
  };
  Ok(StreamHandle::new(reader, path.display().to_string()))
}

/// Eagerly extracts every member's bytes out of the shard (tar's
/// sequential-only access forces this), leaving per-leaf decode (JSON
/// parsing, tensor reshape, audio decode) for `decode_nested` to do when
/// the caller actually asks for a value. Each extracted leaf is a child
/// of `shard`, so `shard.autoclose()` fires once every leaf drawn from
/// it has been consumed.
fn groups_for_shard(shard: &StreamHandle<Box<dyn Read>>) -> Result<Vec<(String, DecodeTree)>> {
  let mut archive = tar::Archive::new(shard.clone());
  let entries = archive.entries()?;
  TarMemberGroups::new(entries, shard.clone()).collect()
}

pub struct TarReader {
  shards: Vec<PathBuf>,
  schema: Features,
  dtype: Box<dyn DtypeValidator>,
  reshape: Box<dyn ArrayReshape>,
  audio: Box<dyn AudioDecoderFactory>,
}

impl TarReader {
  pub fn new(shards: Vec<PathBuf>, schema: Features) -> Self {
    TarReader {
      shards,
      schema,
      dtype: Box::new(crate::collab::DefaultDtypeValidator),
      reshape: Box::new(crate::collab::DefaultArrayReshape::default()),
      audio: Box::new(crate::collab::DefaultAudioDecoderFactory),
    }
  }

  pub fn with_collaborators(
    shards: Vec<PathBuf>,
    schema: Features,
    dtype: Box<dyn DtypeValidator>,
    reshape: Box<dyn ArrayReshape>,
    audio: Box<dyn AudioDecoderFactory>,
  ) -> Self {
    TarReader {
      shards,
      schema,
      dtype,
      reshape,
      audio,
    }
  }

  /// Reads `dataset_info.json` at `manifest_path` and joins its
  /// `file_list` basenames against the manifest's directory.
  pub fn from_manifest(manifest_path: &Path) -> Result<Self> {
    let info = DatasetInfo::from_json_file(manifest_path)?;
    let dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));
    let shards = info.file_list.iter().map(|name| dir.join(name)).collect();
    let schema = info.features.unwrap_or_else(|| Features::new(Default::default()));
    Ok(TarReader::new(shards, schema))
  }

  pub fn iter(&self) -> TarReaderIter<'_> {
    TarReaderIter {
      reader: self,
      shard_idx: 0,
      shard_handle: None,
      pending: Vec::new().into_iter(),
    }
  }
}

pub struct TarReaderIter<'a> {
  reader: &'a TarReader,
  shard_idx: usize,
  shard_handle: Option<StreamHandle<Box<dyn Read>>>,
  pending: std::vec::IntoIter<(String, DecodeTree)>,
}

impl<'a> Iterator for TarReaderIter<'a> {
  type Item = Result<(PathBuf, String, Value)>;

  fn next(&mut self) -> Option<Self::Item> {
    let collab = Collaborators {
      dtype: self.reader.dtype.as_ref(),
      reshape: self.reader.reshape.as_ref(),
      audio: self.reader.audio.as_ref(),
    };
    let schema_root = FeatureType::Mapping(self.reader.schema.0.clone());

    loop {
      if let Some((index, tree)) = self.pending.next() {
        let path = self.reader.shards[self.shard_idx - 1].clone();
        return Some(decode_nested(&schema_root, tree, &collab).map(|record| (path, index, record)));
      }

      if let Some(handle) = self.shard_handle.take() {
        handle.autoclose();
      }
      if self.shard_idx >= self.reader.shards.len() {
        return None;
      }
      let path = self.reader.shards[self.shard_idx].clone();
      self.shard_idx += 1;
      let handle = match open_shard(&path) {
        Ok(h) => h,
        Err(e) => return Some(Err(e)),
      };
      let groups = match groups_for_shard(&handle) {
        Ok(g) => g,
        Err(e) => return Some(Err(e)),
      };
      self.pending = groups.into_iter();
      self.shard_handle = Some(handle);
    }
  }
}
