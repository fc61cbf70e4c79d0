// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::{lazy::SeriesKind,
            Frequency,
            Fubar,
            LazyTimeSeries,
            Result,
            TimeSeries,
            UniformTimeSeries,
            VariableTimeSeries};
use getset::{CopyGetters, Getters};
use std::fmt;


/// A named, optionally grouped stream of samples together with its metadata.
///
/// Identity (id, name and group) is fixed at creation; channels are looked up
/// by it inside a `Session`. The timeseries is either owned outright or loaded
/// lazily from the package the channel was read from.
#[derive(Clone, Debug, CopyGetters, Getters)]
pub struct Channel {
  #[getset(get_copy = "pub")]
  id:          u32,
  #[getset(get = "pub")]
  name:        String,
  #[getset(get = "pub")]
  group:       Option<String>,
  #[getset(get = "pub")]
  units:       Option<String>,
  #[getset(get = "pub")]
  description: Option<String>,
  series:      ChannelSeries,
}

impl Channel {
  pub fn new<S: Into<ChannelSeries>>(id: u32, name: &str, series: S) -> Self {
    Self { id,
           name: name.to_string(),
           group: None,
           units: None,
           description: None,
           series: series.into() }
  }

  pub fn with_group(mut self, group: &str) -> Self {
    self.group = Some(group.to_string());
    self
  }

  pub fn with_units(mut self, units: &str) -> Self {
    self.units = Some(units.to_string());
    self
  }

  pub fn with_description(mut self, description: &str) -> Self {
    self.description = Some(description.to_string());
    self
  }

  pub(crate) fn with_optional(mut self,
                              group: Option<String>,
                              units: Option<String>,
                              description: Option<String>)
                              -> Self {
    self.group = group;
    self.units = units;
    self.description = description;
    self
  }

  /// The channel's timeseries. Lazily loaded channels fetch their payload on
  /// the first call.
  pub fn timeseries(&self) -> Result<&TimeSeries> {
    match &self.series {
      ChannelSeries::Loaded(series) => Ok(series),
      ChannelSeries::Lazy(lazy) => lazy.get(),
    }
  }

  pub fn timeseries_mut(&mut self) -> Result<&mut TimeSeries> {
    match &mut self.series {
      ChannelSeries::Loaded(series) => Ok(series),
      ChannelSeries::Lazy(lazy) => lazy.get_mut(),
    }
  }

  pub fn is_loaded(&self) -> bool {
    match &self.series {
      ChannelSeries::Loaded(_) => true,
      ChannelSeries::Lazy(lazy) => lazy.is_loaded(),
    }
  }

  /// Sampling rate of a uniform channel. Known without loading any data.
  pub fn frequency(&self) -> Option<Frequency> {
    match &self.series {
      ChannelSeries::Loaded(series) => series.frequency(),
      ChannelSeries::Lazy(lazy) => match lazy.kind() {
        SeriesKind::Uniform(frequency) => Some(frequency),
        SeriesKind::Variable => None,
      },
    }
  }

  pub fn is_variable(&self) -> bool {
    self.frequency().is_none()
  }

  pub fn len(&self) -> Result<usize> {
    Ok(self.timeseries()?.len())
  }

  pub fn is_empty(&self) -> Result<bool> {
    Ok(self.len()? == 0)
  }

  pub fn append(&mut self, data: &[f32], times: Option<&[i32]>) -> Result<()> {
    self.timeseries_mut()?.append(data, times)
  }

  // REDUCTIONS ------------------------------------------------------------ //

  pub fn min(&self) -> Result<f32> {
    self.reduce(f32::min)
  }

  pub fn max(&self) -> Result<f32> {
    self.reduce(f32::max)
  }

  pub fn average(&self) -> Result<f32> {
    let data = self.timeseries()?.data();
    ensure!(!data.is_empty(), Fubar::EmptySeries);
    let sum = data.iter().map(|&v| f64::from(v)).sum::<f64>();
    Ok((sum / data.len() as f64) as f32)
  }

  fn reduce(&self, f: fn(f32, f32) -> f32) -> Result<f32> {
    let data = self.timeseries()?.data();
    let (&first, rest) = data.split_first().ok_or(Fubar::EmptySeries)?;
    Ok(rest.iter().fold(first, |acc, &v| f(acc, v)))
  }
}

impl PartialEq for Channel {
  fn eq(&self, other: &Self) -> bool {
    if self.id != other.id
       || self.name != other.name
       || self.group != other.group
       || self.units != other.units
       || self.description != other.description
    {
      return false;
    }

    // a series which can't be loaded isn't equal to anything
    match (self.timeseries(), other.timeseries()) {
      (Ok(lhs), Ok(rhs)) => lhs == rhs,
      _ => false,
    }
  }
}

impl fmt::Display for Channel {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match &self.group {
      Some(group) => write!(f, "Channel {} ({})", self.name, group),
      None => write!(f, "Channel {}", self.name),
    }
  }
}


/// Where a channel's samples live.
#[derive(Clone, Debug)]
pub enum ChannelSeries {
  Loaded(TimeSeries),
  Lazy(LazyTimeSeries),
}

impl From<TimeSeries> for ChannelSeries {
  fn from(series: TimeSeries) -> Self {
    Self::Loaded(series)
  }
}

impl From<UniformTimeSeries> for ChannelSeries {
  fn from(series: UniformTimeSeries) -> Self {
    Self::Loaded(series.into())
  }
}

impl From<VariableTimeSeries> for ChannelSeries {
  fn from(series: VariableTimeSeries) -> Self {
    Self::Loaded(series.into())
  }
}

impl From<LazyTimeSeries> for ChannelSeries {
  fn from(series: LazyTimeSeries) -> Self {
    Self::Lazy(series)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::{assert_eq, assert_ne};
  use crate::{ChannelSource, MemoryPackage};
  use std::sync::Weak;


  fn speed() -> Channel {
    let series = UniformTimeSeries::new(Frequency::new(10).unwrap(),
                                        vec![10.0, 30.0, 20.0, 40.0],
                                        0);
    Channel::new(0, "Speed", series).with_group("Position")
                                    .with_units("km/h")
  }

  #[test]
  fn channel_test() {
    let channel = speed();
    assert_eq!(0, channel.id());
    assert_eq!("Speed", channel.name());
    assert_eq!(&Some("Position".to_string()), channel.group());
    assert_eq!(&Some("km/h".to_string()), channel.units());
    assert_eq!(&None, channel.description());
    assert_eq!(Some(Frequency::new(10).unwrap()), channel.frequency());
    assert_eq!(false, channel.is_variable());
    assert_eq!(true, channel.is_loaded());
    assert_eq!(4, channel.len().unwrap());
    assert_eq!("Channel Speed (Position)", &channel.to_string());

    let other = Channel::new(1, "Speed", VariableTimeSeries::default());
    assert_eq!(true, other.is_variable());
    assert_eq!(true, other.is_empty().unwrap());
    assert_eq!("Channel Speed", &other.to_string());
    assert_ne!(channel, other);
  }

  #[test]
  fn reductions_test() {
    let channel = speed();
    assert_eq!(10.0, channel.min().unwrap());
    assert_eq!(40.0, channel.max().unwrap());
    assert_eq!(25.0, channel.average().unwrap());

    let empty = Channel::new(1, "Empty", VariableTimeSeries::default());
    assert_eq!(Err(Fubar::EmptySeries), empty.min());
    assert_eq!(Err(Fubar::EmptySeries), empty.max());
    assert_eq!(Err(Fubar::EmptySeries), empty.average());
  }

  #[test]
  fn append_test() {
    let mut channel = speed();
    channel.append(&[50.0], None).unwrap();
    assert_eq!(5, channel.len().unwrap());
    assert_eq!(50.0, channel.max().unwrap());

    assert!(matches!(channel.append(&[1.0], Some(&[1])),
                     Err(Fubar::InvalidArgument(_))));

    let mut channel = Channel::new(1, "Gear", VariableTimeSeries::default());
    channel.append(&[1.0, 2.0], Some(&[0, 250])).unwrap();
    assert_eq!(1.5, channel.timeseries().unwrap().at(125.0).unwrap());
  }

  #[test]
  fn unloadable_test() {
    let source: Weak<dyn ChannelSource> = Weak::<MemoryPackage>::new();
    let lazy = LazyTimeSeries::new(0, SeriesKind::Variable, source);
    let channel = Channel::new(0, "Speed", lazy.clone()).with_group("Position")
                                                        .with_units("km/h");

    // shape is known without a source, the data is not
    assert_eq!(false, channel.is_loaded());
    assert_eq!(true, channel.is_variable());
    assert_eq!(Err(Fubar::PackageClosed), channel.min());
    assert_ne!(channel, channel.clone());
  }
}
