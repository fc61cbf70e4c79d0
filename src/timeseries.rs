// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::{Epoch, Frequency, Fubar, Result};
use getset::{CopyGetters, Getters};
use std::{iter, slice};


/// Samples with an explicit timestamp (ms) each. Timestamps are expected to
/// be monotonically non-decreasing, which is not enforced.
#[derive(Clone, Debug, Default, CopyGetters, Getters)]
pub struct VariableTimeSeries {
  #[getset(get = "pub")]
  data:   Vec<f32>,
  #[getset(get = "pub")]
  times:  Vec<i32>,
  #[getset(get_copy = "pub")]
  offset: i64,
}

impl VariableTimeSeries {
  pub fn new(data: Vec<f32>, times: Vec<i32>, offset: i64) -> Result<Self> {
    ensure!(data.len() == times.len(),
            Fubar::LengthMismatch { data:  data.len(),
                                    times: times.len(), });
    Ok(Self { data,
              times,
              offset })
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// The time of the last sample, or zero for an empty series.
  pub fn duration(&self) -> i64 {
    self.times.last().map_or(0, |&time| time as i64)
  }

  pub fn end_time(&self) -> i64 {
    self.offset + self.duration()
  }

  /// Sample at `time`, linearly interpolated between the two neighbouring
  /// samples. Times outside of `[first, last]` are never extrapolated.
  pub fn at(&self, time: f64) -> Result<f32> {
    let (first, last) = match (self.times.first(), self.times.last()) {
      (Some(&first), Some(&last)) => (first as f64, last as f64),
      _ => return Err(Fubar::OutOfRange(format!("{} in empty series", time))),
    };
    ensure!(time >= first && time <= last,
            Fubar::OutOfRange(format!("{} not within [{}, {}]",
                                      time, first, last)));

    let idx = self.times.partition_point(|&t| (t as f64) < time);
    if idx == 0 || self.times[idx] as f64 == time {
      return Ok(self.data[idx]);
    }

    let (t0, t1) = (self.times[idx - 1] as f64, self.times[idx] as f64);
    let (v0, v1) = (self.data[idx - 1] as f64, self.data[idx] as f64);
    Ok((v0 + (v1 - v0) * (time - t0) / (t1 - t0)) as f32)
  }

  pub fn get(&self, index: usize) -> Result<f32> {
    self.data
        .get(index)
        .copied()
        .ok_or(Fubar::IndexOutOfBounds { index,
                                         len: self.len() })
  }

  /// Index of the first sample recorded at or after `time`.
  pub fn index_at(&self, time: f64) -> Result<usize> {
    self.times
        .iter()
        .position(|&t| t as f64 >= time)
        .ok_or_else(|| {
          Fubar::OutOfRange(format!("{} exceeds length of time series", time))
        })
  }

  /// The actual samples covering `epoch`, both ends inclusive. No
  /// interpolation takes place at the boundaries.
  pub fn slice(&self, epoch: &Epoch) -> Result<Self> {
    let start = self.index_at(epoch.offset() as f64)?;
    let end = match epoch.end() {
      Some(end) => self.index_at(end as f64)?,
      None => self.len() - 1,
    };

    Self::new(self.data[start..=end].to_vec(),
              self.times[start..=end].to_vec(),
              epoch.offset())
  }

  /// Appends samples and their times. Keeping the times ordered is up to
  /// the caller.
  pub fn append(&mut self, data: &[f32], times: &[i32]) -> Result<()> {
    ensure!(data.len() == times.len(),
            Fubar::LengthMismatch { data:  data.len(),
                                    times: times.len(), });
    self.data.extend_from_slice(data);
    self.times.extend_from_slice(times);
    Ok(())
  }

  pub fn push(&mut self, value: f32, time: i32) {
    self.data.push(value);
    self.times.push(time);
  }

  pub fn iter(&self) -> iter::Zip<slice::Iter<i32>, slice::Iter<f32>> {
    self.times.iter().zip(self.data.iter())
  }
}

impl PartialEq for VariableTimeSeries {
  fn eq(&self, other: &Self) -> bool {
    self.data == other.data && self.times == other.times
  }
}


/// Samples taken at a fixed `Frequency`, starting at `offset` (ms). Sample
/// times are computed, never stored.
#[derive(Clone, Debug, CopyGetters, Getters)]
pub struct UniformTimeSeries {
  #[getset(get_copy = "pub")]
  frequency: Frequency,
  #[getset(get = "pub")]
  data:      Vec<f32>,
  #[getset(get_copy = "pub")]
  offset:    i64,
}

impl UniformTimeSeries {
  pub fn new(frequency: Frequency, data: Vec<f32>, offset: i64) -> Self {
    Self { frequency,
           data,
           offset }
  }

  pub fn empty(frequency: Frequency) -> Self {
    Self::new(frequency, Vec::new(), 0)
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn interval(&self) -> i64 {
    self.frequency.interval() as i64
  }

  pub fn times(&self) -> Vec<i64> {
    (0..self.len() as i64).map(|i| self.offset + i * self.interval())
                          .collect()
  }

  pub fn duration(&self) -> i64 {
    self.len() as i64 * self.interval()
  }

  pub fn end_time(&self) -> i64 {
    self.offset + self.duration()
  }

  /// Sample at `time`, linearly interpolated between the two neighbouring
  /// samples. Only times between the first and the last sample are valid.
  pub fn at(&self, time: f64) -> Result<f32> {
    ensure!(!self.is_empty(),
            Fubar::OutOfRange(format!("{} in empty series", time)));

    let first = self.offset as f64;
    let last = (self.offset + (self.len() as i64 - 1) * self.interval()) as f64;
    ensure!(time >= first && time <= last,
            Fubar::OutOfRange(format!("{} not within [{}, {}]",
                                      time, first, last)));

    let position = (time - first) / self.interval() as f64;
    let idx = position.floor() as usize;
    if idx + 1 >= self.len() {
      return Ok(self.data[self.len() - 1]);
    }

    let (v0, v1) = (self.data[idx] as f64, self.data[idx + 1] as f64);
    Ok((v0 + (v1 - v0) * (position - idx as f64)) as f32)
  }

  pub fn get(&self, index: usize) -> Result<f32> {
    self.data
        .get(index)
        .copied()
        .ok_or(Fubar::IndexOutOfBounds { index,
                                         len: self.len() })
  }

  /// Interpolates this series onto the grid `[epoch.offset, epoch.end)` at
  /// its own interval. Fails if the epoch reaches past `end_time`.
  pub fn slice(&self, epoch: &Epoch) -> Result<Self> {
    let end = epoch.end().unwrap_or_else(|| self.end_time());
    ensure!(end <= self.end_time(),
            Fubar::OutOfRange(format!("epoch end {} exceeds end time {}",
                                      end,
                                      self.end_time())));

    let data = (epoch.offset()..end).step_by(self.interval() as usize)
                                    .map(|time| self.at(time as f64))
                                    .collect::<Result<Vec<_>>>()?;

    Ok(Self::new(self.frequency, data, epoch.offset()))
  }

  /// Converts this series to another sampling rate. The two rates must be
  /// integer multiples of each other.
  ///
  /// Upsampling interpolates linearly between neighbouring samples (holding
  /// the last sample at the tail), downsampling averages blocks of
  /// `current / target` samples.
  pub fn resample(&self, frequency: Frequency) -> Result<Self> {
    if frequency == self.frequency {
      return Ok(self.clone());
    }
    if self.is_empty() {
      return Ok(Self::new(frequency, Vec::new(), self.offset));
    }

    let (current, target) = (self.frequency.frequency(), frequency.frequency());
    let data = if target > current {
      ensure!(target % current == 0,
              Fubar::InvalidArgument(format!("cannot upsample {} to {}",
                                             self.frequency, frequency)));
      self.upsampled((target / current) as usize)
    } else {
      ensure!(current % target == 0,
              Fubar::InvalidArgument(format!("cannot downsample {} to {}",
                                             self.frequency, frequency)));
      self.downsampled((current / target) as usize)
    };

    Ok(Self::new(frequency, data, self.offset))
  }

  fn upsampled(&self, factor: usize) -> Vec<f32> {
    let len = self.len();
    (0..len * factor).map(|k| {
                       let (idx, rest) = (k / factor, k % factor);
                       if idx + 1 >= len {
                         return self.data[len - 1];
                       }
                       let (v0, v1) = (self.data[idx], self.data[idx + 1]);
                       v0 + (v1 - v0) * rest as f32 / factor as f32
                     })
                     .collect()
  }

  fn downsampled(&self, factor: usize) -> Vec<f32> {
    self.data
        .chunks(factor)
        .map(|block| block.iter().sum::<f32>() / block.len() as f32)
        .collect()
  }

  pub fn append(&mut self, data: &[f32]) {
    self.data.extend_from_slice(data);
  }

  pub fn push(&mut self, value: f32) {
    self.data.push(value);
  }
}

impl PartialEq for UniformTimeSeries {
  fn eq(&self, other: &Self) -> bool {
    self.frequency == other.frequency && self.data == other.data
  }
}


/// Either kind of timeseries a channel can hold.
#[derive(Clone, Debug, PartialEq)]
pub enum TimeSeries {
  Uniform(UniformTimeSeries),
  Variable(VariableTimeSeries),
}

impl TimeSeries {
  pub fn data(&self) -> &[f32] {
    match self {
      Self::Uniform(series) => series.data(),
      Self::Variable(series) => series.data(),
    }
  }

  /// Absolute sample times; computed for uniform series.
  pub fn times(&self) -> Vec<i64> {
    match self {
      Self::Uniform(series) => series.times(),
      Self::Variable(series) => {
        series.times().iter().map(|&time| time as i64).collect()
      }
    }
  }

  /// The sampling rate, `None` for variable series.
  pub fn frequency(&self) -> Option<Frequency> {
    match self {
      Self::Uniform(series) => Some(series.frequency()),
      Self::Variable(_) => None,
    }
  }

  pub fn is_variable(&self) -> bool {
    matches!(self, Self::Variable(_))
  }

  pub fn len(&self) -> usize {
    self.data().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn offset(&self) -> i64 {
    match self {
      Self::Uniform(series) => series.offset(),
      Self::Variable(series) => series.offset(),
    }
  }

  pub fn duration(&self) -> i64 {
    match self {
      Self::Uniform(series) => series.duration(),
      Self::Variable(series) => series.duration(),
    }
  }

  pub fn end_time(&self) -> i64 {
    self.offset() + self.duration()
  }

  pub fn at(&self, time: f64) -> Result<f32> {
    match self {
      Self::Uniform(series) => series.at(time),
      Self::Variable(series) => series.at(time),
    }
  }

  pub fn get(&self, index: usize) -> Result<f32> {
    match self {
      Self::Uniform(series) => series.get(index),
      Self::Variable(series) => series.get(index),
    }
  }

  pub fn slice(&self, epoch: &Epoch) -> Result<Self> {
    Ok(match self {
      Self::Uniform(series) => Self::Uniform(series.slice(epoch)?),
      Self::Variable(series) => Self::Variable(series.slice(epoch)?),
    })
  }

  /// Appends samples; variable series need a time for every sample, uniform
  /// series must not be given any.
  pub fn append(&mut self, data: &[f32], times: Option<&[i32]>) -> Result<()> {
    match (self, times) {
      (Self::Uniform(series), None) => {
        series.append(data);
        Ok(())
      }
      (Self::Uniform(_), Some(_)) => {
        Err(Fubar::InvalidArgument("uniform series take no sample times"
                                     .to_string()))
      }
      (Self::Variable(series), times) => {
        series.append(data, times.unwrap_or_default())
      }
    }
  }
}

impl From<UniformTimeSeries> for TimeSeries {
  fn from(series: UniformTimeSeries) -> Self {
    Self::Uniform(series)
  }
}

impl From<VariableTimeSeries> for TimeSeries {
  fn from(series: VariableTimeSeries) -> Self {
    Self::Variable(series)
  }
}
