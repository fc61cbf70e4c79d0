// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::{service as srv,
            Frequency,
            Fubar,
            Result,
            TimeSeries,
            UniformTimeSeries,
            VariableTimeSeries};
use once_cell::sync::OnceCell;
use std::{fmt, sync::Weak};
use tracing::debug;


/// The two raw payloads a channel can have in a package.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Payload {
  /// `f32` samples, `data/<id>.bin`
  Samples,
  /// `i32` sample times of variable rate channels, `data/<id>.tms`
  Times,
}

impl Payload {
  pub fn entry(self, channel_id: u32) -> String {
    match self {
      Self::Samples => srv::entry_path(channel_id, srv::SAMPLES_EXTENSION),
      Self::Times => srv::entry_path(channel_id, srv::TIMES_EXTENSION),
    }
  }
}


/// Anything able to hand out the raw payload bytes of a channel.
pub trait ChannelSource: Send + Sync {
  fn fetch(&self, channel_id: u32, payload: Payload) -> Result<Vec<u8>>;
}


/// What a lazily loaded series will look like once loaded. Known up front
/// from the metadata document.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SeriesKind {
  Uniform(Frequency),
  Variable,
}


/// A timeseries whose payload is fetched from a `ChannelSource` on first
/// access and cached from then on.
///
/// The source is only borrowed through a `Weak` reference; whoever opened it
/// (usually the `Session`) holds the strong one. Once that is gone, loading
/// fails with `Fubar::PackageClosed`.
#[derive(Clone)]
pub struct LazyTimeSeries {
  channel_id: u32,
  kind:       SeriesKind,
  source:     Weak<dyn ChannelSource>,
  series:     OnceCell<TimeSeries>,
}

impl LazyTimeSeries {
  pub fn new(channel_id: u32,
             kind: SeriesKind,
             source: Weak<dyn ChannelSource>)
             -> Self {
    Self { channel_id,
           kind,
           source,
           series: OnceCell::new() }
  }

  pub fn channel_id(&self) -> u32 {
    self.channel_id
  }

  pub fn kind(&self) -> SeriesKind {
    self.kind
  }

  pub fn is_loaded(&self) -> bool {
    self.series.get().is_some()
  }

  /// The series, loading it if this is the first access.
  pub fn get(&self) -> Result<&TimeSeries> {
    self.series.get_or_try_init(|| self.load())
  }

  pub fn get_mut(&mut self) -> Result<&mut TimeSeries> {
    if !self.is_loaded() {
      self.series = OnceCell::from(self.load()?);
    }
    self.series.get_mut().ok_or(Fubar::PackageClosed)
  }

  pub fn into_inner(self) -> Result<TimeSeries> {
    let Self { channel_id,
               kind,
               source,
               series, } = self;
    match series.into_inner() {
      Some(series) => Ok(series),
      None => load(channel_id, kind, &source),
    }
  }

  fn load(&self) -> Result<TimeSeries> {
    load(self.channel_id, self.kind, &self.source)
  }
}

fn load(channel_id: u32,
        kind: SeriesKind,
        source: &Weak<dyn ChannelSource>)
        -> Result<TimeSeries> {
  let source = source.upgrade().ok_or(Fubar::PackageClosed)?;
  debug!(channel_id, ?kind, "loading channel payload");

  let data = srv::bytes_to_f32(&source.fetch(channel_id, Payload::Samples)?)?;
  Ok(match kind {
    SeriesKind::Uniform(frequency) => {
      UniformTimeSeries::new(frequency, data, 0).into()
    }
    SeriesKind::Variable => {
      let times =
        srv::bytes_to_i32(&source.fetch(channel_id, Payload::Times)?)?;
      VariableTimeSeries::new(data, times, 0)?.into()
    }
  })
}

impl fmt::Debug for LazyTimeSeries {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.debug_struct("LazyTimeSeries")
     .field("channel_id", &self.channel_id)
     .field("kind", &self.kind)
     .field("series", &self.series.get())
     .finish()
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use std::{collections::HashMap,
            sync::{atomic::{AtomicUsize, Ordering},
                   Arc}};


  #[derive(Default)]
  struct CountingSource {
    entries: HashMap<String, Vec<u8>>,
    fetches: AtomicUsize,
  }

  impl ChannelSource for CountingSource {
    fn fetch(&self, channel_id: u32, payload: Payload) -> Result<Vec<u8>> {
      self.fetches.fetch_add(1, Ordering::SeqCst);
      let entry = payload.entry(channel_id);
      self.entries
          .get(&entry)
          .cloned()
          .ok_or(Fubar::ChannelDataNotFound { id: channel_id, entry })
    }
  }

  fn source() -> Arc<CountingSource> {
    let mut source = CountingSource::default();
    source.entries
          .insert("data/1.bin".to_string(),
                  srv::f32_to_bytes(&[1.0, 2.0, 3.0]));
    source.entries
          .insert("data/2.bin".to_string(), srv::f32_to_bytes(&[4.0, 5.0]));
    source.entries
          .insert("data/2.tms".to_string(), srv::i32_to_bytes(&[10, 30]));
    Arc::new(source)
  }

  fn weak(source: &Arc<CountingSource>) -> Weak<dyn ChannelSource> {
    let source: Arc<dyn ChannelSource> = source.clone();
    Arc::downgrade(&source)
  }

  #[test]
  fn payload_entry_test() {
    assert_eq!("data/7.bin", &Payload::Samples.entry(7));
    assert_eq!("data/7.tms", &Payload::Times.entry(7));
  }

  #[test]
  fn loads_once_test() {
    let source = source();
    let frequency = Frequency::new(10).unwrap();
    let lazy = LazyTimeSeries::new(1, SeriesKind::Uniform(frequency), weak(&source));

    assert_eq!(false, lazy.is_loaded());
    assert_eq!(0, source.fetches.load(Ordering::SeqCst));

    assert_eq!(&[1.0, 2.0, 3.0], lazy.get().unwrap().data());
    assert_eq!(&[1.0, 2.0, 3.0], lazy.get().unwrap().data());
    assert_eq!(true, lazy.is_loaded());
    assert_eq!(1, source.fetches.load(Ordering::SeqCst));
    assert_eq!(Some(frequency), lazy.get().unwrap().frequency());
  }

  #[test]
  fn variable_test() {
    let source = source();
    let mut lazy = LazyTimeSeries::new(2, SeriesKind::Variable, weak(&source));

    let series = lazy.get_mut().unwrap();
    assert_eq!(vec![10, 30], series.times());
    series.append(&[6.0], Some(&[50])).unwrap();
    assert_eq!(3, lazy.get().unwrap().len());

    // samples and times, both fetched exactly once
    assert_eq!(2, source.fetches.load(Ordering::SeqCst));
    assert_eq!(5.5, lazy.into_inner().unwrap().at(40.0).unwrap());
  }

  #[test]
  fn missing_payload_test() {
    let source = source();
    let lazy = LazyTimeSeries::new(3, SeriesKind::Variable, weak(&source));
    assert_eq!(Err(Fubar::ChannelDataNotFound { id:    3,
                                                entry: "data/3.bin".to_string(), }),
               lazy.get().map(|_| ()));
    assert_eq!(false, lazy.is_loaded());
  }

  #[test]
  fn closed_source_test() {
    let source = source();
    let lazy = LazyTimeSeries::new(1, SeriesKind::Variable, weak(&source));
    drop(source);
    assert_eq!(Err(Fubar::PackageClosed), lazy.get().map(|_| ()));
  }
}
