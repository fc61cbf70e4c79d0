// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::{ChannelSource, Fubar, Payload, Result};
use getset::CopyGetters;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap,
          fmt,
          fs::{self, File},
          io::{Read, Write},
          path::{Path, PathBuf},
          sync::{Mutex, PoisonError}};
use tracing::{debug, warn};
use zip::{result::ZipError, write::FileOptions, CompressionMethod, ZipArchive, ZipWriter};


/// Read access to the named entries of a package.
pub trait PackageStore: Send + Sync {
  /// Contents of entry `name`, `Fubar::EntryNotFound` if there is none.
  fn extract_entry(&self, name: &str) -> Result<Vec<u8>>;
  fn entry_names(&self) -> Vec<String>;
}

/// Write access to a package.
pub trait PackageSink {
  fn write_entry(&mut self, name: &str, bytes: &[u8]) -> Result<()>;
}

impl<P: PackageStore> ChannelSource for P {
  fn fetch(&self, channel_id: u32, payload: Payload) -> Result<Vec<u8>> {
    self.extract_entry(&payload.entry(channel_id))
        .map_err(|err| match err {
          Fubar::EntryNotFound(entry) => Fubar::ChannelDataNotFound { id: channel_id,
                                                                      entry },
          err => err,
        })
  }
}


// CONFIGURATION --------------------------------------------------------- //

/// How entries are compressed when writing an archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
  Stored,
  Deflated,
}

impl Default for Compression {
  fn default() -> Self {
    Self::Deflated
  }
}

impl From<Compression> for CompressionMethod {
  fn from(compression: Compression) -> Self {
    match compression {
      Compression::Stored => CompressionMethod::Stored,
      Compression::Deflated => CompressionMethod::Deflated,
    }
  }
}

/// Options for writing archives.
#[derive(Clone,
         Copy,
         Debug,
         Default,
         PartialEq,
         Eq,
         CopyGetters,
         Serialize,
         Deserialize)]
#[getset(get_copy = "pub")]
#[serde(default)]
pub struct ArchiveOptions {
  compression: Compression,
}

impl ArchiveOptions {
  pub fn new(compression: Compression) -> Self {
    Self { compression }
  }
}


// READING --------------------------------------------------------------- //

/// A zip archive on disk, open for reading until dropped.
pub struct ZipPackage {
  path:    PathBuf,
  archive: Mutex<ZipArchive<File>>,
}

impl ZipPackage {
  pub fn open(path: &Path) -> Result<Self> {
    ensure!(path.is_file(),
            Fubar::Io(format!("path does not exist or is not a file ({})",
                              path.display())));

    let archive = ZipArchive::new(File::open(path)?)?;
    debug!(path = %path.display(), entries = archive.len(), "opened package");
    Ok(Self { path:    path.to_owned(),
              archive: Mutex::new(archive), })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl PackageStore for ZipPackage {
  fn extract_entry(&self, name: &str) -> Result<Vec<u8>> {
    let mut archive = self.archive.lock().unwrap_or_else(PoisonError::into_inner);
    let mut entry = match archive.by_name(name) {
      Ok(entry) => entry,
      Err(ZipError::FileNotFound) => return Err(Fubar::EntryNotFound(name.to_string())),
      Err(err) => return Err(err.into()),
    };

    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes)?;
    Ok(bytes)
  }

  fn entry_names(&self) -> Vec<String> {
    let archive = self.archive.lock().unwrap_or_else(PoisonError::into_inner);
    archive.file_names().map(String::from).collect()
  }
}

impl Drop for ZipPackage {
  fn drop(&mut self) {
    debug!(path = %self.path.display(), "closed package");
  }
}

impl fmt::Debug for ZipPackage {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.debug_struct("ZipPackage").field("path", &self.path).finish()
  }
}


// WRITING --------------------------------------------------------------- //

/// A zip archive being written. Nothing is left on disk unless `commit` is
/// called and succeeds; dropping an uncommitted writer deletes the file.
pub struct ArchiveWriter {
  path:      PathBuf,
  options:   FileOptions,
  writer:    Option<ZipWriter<File>>,
  committed: bool,
}

impl ArchiveWriter {
  pub fn create(path: &Path, options: &ArchiveOptions) -> Result<Self> {
    let writer = ZipWriter::new(File::create(path)?);
    debug!(path = %path.display(), ?options, "creating package");
    Ok(Self { path:      path.to_owned(),
              options:   FileOptions::default().compression_method(options.compression()
                                                                          .into()),
              writer:    Some(writer),
              committed: false, })
  }

  pub fn commit(mut self) -> Result<()> {
    let mut writer = self.writer.take().ok_or(Fubar::PackageClosed)?;
    writer.finish()?;
    self.committed = true;
    Ok(())
  }
}

impl PackageSink for ArchiveWriter {
  fn write_entry(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
    let writer = self.writer.as_mut().ok_or(Fubar::PackageClosed)?;
    writer.start_file(name, self.options)?;
    writer.write_all(bytes)?;
    Ok(())
  }
}

impl Drop for ArchiveWriter {
  fn drop(&mut self) {
    if self.committed {
      return;
    }

    drop(self.writer.take());
    match fs::remove_file(&self.path) {
      Ok(()) => warn!(path = %self.path.display(), "removed partially written package"),
      Err(err) => warn!(path = %self.path.display(),
                        error = %err,
                        "could not remove partially written package"),
    }
  }
}


// IN MEMORY ------------------------------------------------------------- //

/// A package living entirely in memory.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryPackage {
  entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryPackage {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn remove_entry(&mut self, name: &str) -> Option<Vec<u8>> {
    self.entries.remove(name)
  }
}

impl PackageStore for MemoryPackage {
  fn extract_entry(&self, name: &str) -> Result<Vec<u8>> {
    self.entries
        .get(name)
        .cloned()
        .ok_or_else(|| Fubar::EntryNotFound(name.to_string()))
  }

  fn entry_names(&self) -> Vec<String> {
    self.entries.keys().cloned().collect()
  }
}

impl PackageSink for MemoryPackage {
  fn write_entry(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
    self.entries.insert(name.to_string(), bytes.to_vec());
    Ok(())
  }
}
