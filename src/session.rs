// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::{codec::{self, ChannelHeader, Document, META_ENTRY},
            derive_laps,
            lazy::SeriesKind,
            service as srv,
            ArchiveOptions,
            ArchiveWriter,
            Channel,
            ChannelSource,
            Frequency,
            Fubar,
            Lap,
            LazyTimeSeries,
            Metadata,
            PackageSink,
            PackageStore,
            Payload,
            Result,
            TimeSeries,
            ZipPackage};
use getset::{CopyGetters, Getters};
use once_cell::sync::OnceCell;
use std::{collections::{BTreeMap, HashMap},
          fmt,
          path::{Path, PathBuf},
          sync::Arc};
use tracing::debug;


/// A recorded telemetry session: metadata, channels, markers and the laps
/// derived from them.
///
/// A session loaded from a package keeps the package open so channel data
/// can be read on demand. It is released by `close` or when the session is
/// dropped; channels not read until then can't be read anymore.
#[derive(Getters, CopyGetters)]
pub struct Session {
  #[getset(get = "pub")]
  metadata:           Metadata,
  channels:           Vec<Channel>,
  by_key:             HashMap<(String, Option<String>), usize>,
  by_id:              HashMap<u32, usize>,
  group_descriptions: BTreeMap<String, String>,
  #[getset(get = "pub")]
  markers:            Vec<f64>,
  #[getset(get_copy = "pub")]
  num_sectors:        Option<usize>,
  laps:               OnceCell<Vec<Lap>>,
  #[getset(get = "pub")]
  path:               Option<PathBuf>,
  package:            Option<Arc<dyn ChannelSource>>,
}

impl Session {
  pub fn new(metadata: Metadata) -> Self {
    Self { metadata,
           channels: Vec::new(),
           by_key: HashMap::new(),
           by_id: HashMap::new(),
           group_descriptions: BTreeMap::new(),
           markers: Vec::new(),
           num_sectors: None,
           laps: OnceCell::new(),
           path: None,
           package: None }
  }

  // PACKAGE OPENING / CLOSING FUNCTIONS ----------------------------------- //

  /// Loads a session from the package at `path`. Channel data is not read
  /// until it is accessed.
  pub fn load(path: &Path) -> Result<Self> {
    let mut session = Self::from_store(ZipPackage::open(path)?)?;
    session.path = Some(path.to_owned());
    debug!(path = %path.display(),
           channels = session.channels.len(),
           "loaded session");
    Ok(session)
  }

  /// Loads a session from any package store. The store is owned by the
  /// session from here on.
  pub fn from_store<P: PackageStore + 'static>(store: P) -> Result<Self> {
    let bytes = match store.extract_entry(META_ENTRY) {
      Ok(bytes) => bytes,
      Err(Fubar::EntryNotFound(_)) => return Err(Fubar::MissingMetadata),
      Err(err) => return Err(err),
    };
    let document = codec::decode(&bytes)?;

    let store: Arc<dyn ChannelSource> = Arc::new(store);
    let mut session = Self::new(document.metadata);
    for header in document.channels {
      let kind = match header.interval {
        Some(interval) => SeriesKind::Uniform(Frequency::from_interval(interval)?),
        None => SeriesKind::Variable,
      };
      let series = LazyTimeSeries::new(header.id, kind, Arc::downgrade(&store));
      let channel = Channel::new(header.id, &header.name, series);
      session.add_channel(channel.with_optional(header.group,
                                                header.units,
                                                header.description))?;
    }

    session.group_descriptions = document.group_descriptions;
    session.markers = document.markers;
    session.num_sectors = document.num_sectors;
    session.package = Some(store);
    Ok(session)
  }

  /// Releases the package this session was loaded from.
  pub fn close(&mut self) {
    if self.package.take().is_some() {
      debug!(path = ?self.path, "closed session");
    }
  }

  pub fn is_open(&self) -> bool {
    self.package.is_some()
  }

  /// Writes this session to `path` with default options.
  pub fn write(&self, path: &Path) -> Result<()> {
    self.write_with(path, &ArchiveOptions::default())
  }

  /// Writes this session to `path`. Either the whole session is written or
  /// nothing is left at `path`.
  pub fn write_with(&self, path: &Path, options: &ArchiveOptions) -> Result<()> {
    // everything is gathered up front, `path` may be where our data lives
    let entries = self.entries()?;

    let mut archive = ArchiveWriter::create(path, options)?;
    for (name, bytes) in &entries {
      archive.write_entry(name, bytes)?;
    }
    archive.commit()?;

    debug!(path = %path.display(), entries = entries.len(), "wrote session");
    Ok(())
  }

  /// Writes all entries of this session into `sink`.
  pub fn write_to<S: PackageSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
    for (name, bytes) in self.entries()? {
      sink.write_entry(&name, &bytes)?;
    }
    Ok(())
  }

  fn entries(&self) -> Result<Vec<(String, Vec<u8>)>> {
    // only the interval is stored, the rate has to be recoverable from it
    for channel in &self.channels {
      if let Some(frequency) = channel.frequency() {
        ensure!(Frequency::from_interval(frequency.interval())? == frequency,
                Fubar::InvalidArgument(format!("{} of {} has no whole \
                                                millisecond interval",
                                               frequency, channel)));
      }
    }

    let mut entries = Vec::with_capacity(1 + 2 * self.channels.len());
    entries.push((META_ENTRY.to_string(), codec::encode(&self.document())?));

    for channel in &self.channels {
      let series = channel.timeseries()?;
      entries.push((Payload::Samples.entry(channel.id()),
                    srv::f32_to_bytes(series.data())));
      if let TimeSeries::Variable(series) = series {
        entries.push((Payload::Times.entry(channel.id()),
                      srv::i32_to_bytes(series.times())));
      }
    }
    Ok(entries)
  }

  fn document(&self) -> Document {
    let channels =
      self.channels
          .iter()
          .map(|channel| ChannelHeader { id:          channel.id(),
                                         name:        channel.name().clone(),
                                         group:       channel.group().clone(),
                                         interval:    channel.frequency()
                                                             .map(|f| f.interval()),
                                         units:       channel.units().clone(),
                                         description: channel.description().clone(), })
          .collect();

    Document { metadata: self.metadata.clone(),
               channels,
               group_descriptions: self.group_descriptions.clone(),
               markers: self.markers.clone(),
               num_sectors: self.num_sectors }
  }

  // METADATA -------------------------------------------------------------- //

  /// Mutable access to the metadata. Invalidates the laps, since the session
  /// duration takes part in deriving them.
  pub fn metadata_mut(&mut self) -> &mut Metadata {
    self.laps = OnceCell::new();
    &mut self.metadata
  }

  // CHANNELS -------------------------------------------------------------- //

  /// Adds a channel. Both its id and its name within its group must be
  /// unique in this session.
  pub fn add_channel(&mut self, channel: Channel) -> Result<()> {
    let key = (channel.name().clone(), channel.group().clone());
    ensure!(!self.by_key.contains_key(&key),
            Fubar::DuplicateChannel(channel.to_string()));
    ensure!(!self.by_id.contains_key(&channel.id()),
            Fubar::DuplicateChannel(format!("channel id {}", channel.id())));

    debug!(id = channel.id(), channel = %channel, "adding channel");
    self.by_key.insert(key, self.channels.len());
    self.by_id.insert(channel.id(), self.channels.len());
    self.channels.push(channel);
    Ok(())
  }

  /// All channels in the order they were added.
  pub fn channels(&self) -> &[Channel] {
    &self.channels
  }

  pub fn channel_count(&self) -> usize {
    self.channels.len()
  }

  pub fn get_channel(&self, name: &str, group: Option<&str>) -> Option<&Channel> {
    self.by_key
        .get(&(name.to_string(), group.map(String::from)))
        .map(|&index| &self.channels[index])
  }

  pub fn get_channel_mut(&mut self,
                         name: &str,
                         group: Option<&str>)
                         -> Option<&mut Channel> {
    let index = *self.by_key.get(&(name.to_string(), group.map(String::from)))?;
    self.channels.get_mut(index)
  }

  pub fn get_channel_by_id(&self, id: u32) -> Option<&Channel> {
    self.by_id.get(&id).map(|&index| &self.channels[index])
  }

  /// All channels of `group`, empty if there is no such group.
  pub fn get_group(&self, group: &str) -> Vec<&Channel> {
    self.channels
        .iter()
        .filter(|channel| channel.group().as_deref() == Some(group))
        .collect()
  }

  /// All channels called `name`, regardless of their group.
  pub fn find_channel(&self, name: &str) -> Vec<&Channel> {
    self.channels
        .iter()
        .filter(|channel| channel.name() == name)
        .collect()
  }

  /// Names of all groups in order of appearance.
  pub fn groups(&self) -> Vec<&str> {
    let mut groups: Vec<&str> = Vec::new();
    for group in self.channels.iter().filter_map(|c| c.group().as_deref()) {
      if !groups.contains(&group) {
        groups.push(group);
      }
    }
    groups
  }

  pub fn group_description(&self, group: &str) -> Option<&str> {
    self.group_descriptions.get(group).map(String::as_str)
  }

  pub fn set_group_description(&mut self, group: &str, description: &str) {
    self.group_descriptions
        .insert(group.to_string(), description.to_string());
  }

  // MARKERS AND LAPS ------------------------------------------------------ //

  /// Appends a marker. Markers are expected in chronological order, they are
  /// not sorted.
  pub fn add_marker(&mut self, time: f64) {
    self.markers.push(time);
    self.laps = OnceCell::new();
  }

  pub fn add_markers<I: IntoIterator<Item = f64>>(&mut self, times: I) {
    self.markers.extend(times);
    self.laps = OnceCell::new();
  }

  pub fn set_markers(&mut self, markers: Vec<f64>) {
    self.markers = markers;
    self.laps = OnceCell::new();
  }

  /// Sets the number of sectors per lap, `None` disables lap segmentation.
  pub fn set_num_sectors(&mut self, num_sectors: Option<usize>) {
    self.num_sectors = num_sectors;
    self.laps = OnceCell::new();
  }

  /// The laps of this session, derived from markers, number of sectors and
  /// session duration on first access after any of them changed.
  pub fn laps(&self) -> &[Lap] {
    self.laps.get_or_init(|| {
                derive_laps(&self.markers,
                            self.num_sectors,
                            self.metadata.duration())
              })
  }

  pub fn lap(&self, index: usize) -> Option<&Lap> {
    self.laps().get(index)
  }
}

impl Default for Session {
  fn default() -> Self {
    Self::new(Metadata::default())
  }
}

impl PartialEq for Session {
  fn eq(&self, other: &Self) -> bool {
    self.metadata == other.metadata
    && self.channels == other.channels
    && self.markers == other.markers
    && self.num_sectors == other.num_sectors
  }
}

impl fmt::Debug for Session {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.debug_struct("Session")
     .field("metadata", &self.metadata)
     .field("channels", &self.channels)
     .field("markers", &self.markers)
     .field("num_sectors", &self.num_sectors)
     .field("path", &self.path)
     .field("open", &self.is_open())
     .finish()
  }
}

impl fmt::Display for Session {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self.metadata)
  }
}
