// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::{Fubar, Result};
use getset::CopyGetters;
use serde::{Deserialize, Serialize};
use std::fmt;


/// All times within a session are given in milliseconds, which is sufficient
/// for sampling rates of up to 1 kHz.
pub const BASE_TIME: u32 = 1_000;


/// A sampling rate in Hz together with the sampling interval in milliseconds.
///
/// The interval is derived by integer division, i.e. `Frequency::new(3)` has
/// an interval of 333 ms. Two frequencies are equal if their rates are.
#[derive(Clone, Copy, Debug, CopyGetters, Serialize, Deserialize)]
#[getset(get_copy = "pub")]
pub struct Frequency {
  frequency: u32,
  interval:  u32,
}

impl Frequency {
  pub fn new(frequency: u32) -> Result<Self> {
    ensure!(frequency > 0,
            Fubar::InvalidArgument("frequency must be positive".to_string()));
    ensure!(frequency <= BASE_TIME,
            Fubar::InvalidArgument(format!("frequency {}Hz exceeds {}Hz",
                                           frequency, BASE_TIME)));

    Ok(Self { frequency,
              interval: BASE_TIME / frequency })
  }

  /// Creates a `Frequency` from a sampling interval in milliseconds.
  pub fn from_interval(interval: u32) -> Result<Self> {
    ensure!(interval > 0,
            Fubar::InvalidArgument("interval must be positive".to_string()));
    ensure!(interval <= BASE_TIME,
            Fubar::InvalidArgument(format!("interval {}ms exceeds {}ms",
                                           interval, BASE_TIME)));
    Self::new(BASE_TIME / interval)
  }
}

impl PartialEq for Frequency {
  fn eq(&self, other: &Self) -> bool {
    self.frequency == other.frequency
  }
}

impl Eq for Frequency {}

impl fmt::Display for Frequency {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}Hz", self.frequency)
  }
}


/// A window of time `[offset, offset + length)`. Without a length the epoch
/// reaches until the end of whatever it is applied to.
#[derive(Clone, Copy, Debug, PartialEq, CopyGetters, Serialize, Deserialize)]
#[getset(get_copy = "pub")]
pub struct Epoch {
  offset: i64,
  length: Option<i64>,
}

impl Epoch {
  pub fn new(offset: i64, length: Option<i64>) -> Result<Self> {
    ensure!(offset >= 0,
            Fubar::InvalidArgument(format!("negative epoch offset {}",
                                           offset)));
    if let Some(length) = length {
      ensure!(length >= 0,
              Fubar::InvalidArgument(format!("negative epoch length {}",
                                             length)));
    }

    Ok(Self { offset, length })
  }

  /// Epoch of a given length starting at zero.
  pub fn with_length(length: i64) -> Result<Self> {
    Self::new(0, Some(length))
  }

  /// The end of this epoch, `None` if it is open ended.
  pub fn end(&self) -> Option<i64> {
    self.length.map(|length| self.offset + length)
  }
}
