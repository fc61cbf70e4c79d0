// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::{Lap, Session};


/// Lap analysis. Lap times are only compared between complete laps, sectors
/// are taken from every lap.
impl Session {
  /// Length of `lap` minus length of the lap before it.
  pub fn lap_difference(&self, lap: &Lap) -> Option<f64> {
    lap.difference()
  }

  pub fn fastest_lap_time(&self) -> Option<f64> {
    extreme(self.lap_times(), f64::min)
  }

  pub fn slowest_lap_time(&self) -> Option<f64> {
    extreme(self.lap_times(), f64::max)
  }

  pub fn fastest_lap(&self) -> Option<&Lap> {
    let time = self.fastest_lap_time()?;
    self.complete_laps().find(|lap| lap.length() == Some(time))
  }

  pub fn slowest_lap(&self) -> Option<&Lap> {
    let time = self.slowest_lap_time()?;
    self.complete_laps().find(|lap| lap.length() == Some(time))
  }

  pub fn is_fastest_lap(&self, lap: &Lap) -> bool {
    self.fastest_lap()
        .map_or(false, |fastest| fastest.index() == lap.index())
  }

  /// The fastest lap, or if `lap` is the fastest, the one closest to it.
  pub fn fastest_or_next_fastest_lap(&self, lap: &Lap) -> Option<&Lap> {
    let fastest = self.fastest_lap()?;
    if fastest.index() != lap.index() {
      return Some(fastest);
    }

    let length = lap.length()?;
    self.closest(lap, |other| other >= length, f64::min)
  }

  /// The slowest lap, or if `lap` is the slowest, the one closest to it.
  pub fn slowest_or_next_slowest_lap(&self, lap: &Lap) -> Option<&Lap> {
    let slowest = self.slowest_lap()?;
    if slowest.index() != lap.index() {
      return Some(slowest);
    }

    let length = lap.length()?;
    self.closest(lap, |other| other <= length, f64::max)
  }

  /// Fastest time of sector `n` (counting from 1) over all laps.
  pub fn fastest_sector(&self, n: usize) -> Option<f64> {
    if n == 0 || self.num_sectors().map_or(true, |sectors| n > sectors) {
      return None;
    }
    extreme(self.laps().iter().filter_map(|lap| lap.sector(n)), f64::min)
  }

  pub fn is_fastest_sector(&self, n: usize, time: f64) -> bool {
    self.fastest_sector(n) == Some(time)
  }

  pub fn next_lap(&self, lap: &Lap) -> Option<&Lap> {
    self.laps().get(lap.index() + 1)
  }

  pub fn previous_lap(&self, lap: &Lap) -> Option<&Lap> {
    lap.index().checked_sub(1).and_then(|index| self.laps().get(index))
  }

  fn complete_laps(&self) -> impl Iterator<Item = &Lap> {
    self.laps().iter().filter(|lap| lap.is_complete())
  }

  fn lap_times<'a>(&'a self) -> impl Iterator<Item = f64> + 'a {
    self.complete_laps().filter_map(Lap::length)
  }

  fn closest(&self,
             lap: &Lap,
             accept: impl Fn(f64) -> bool,
             pick: fn(f64, f64) -> f64)
             -> Option<&Lap> {
    let mut best: Option<&Lap> = None;
    for other in self.complete_laps() {
      let length = match other.length() {
        Some(length) => length,
        None => continue,
      };
      if other.index() == lap.index() || !accept(length) {
        continue;
      }

      // the first of several equally close laps wins
      best = match best.and_then(|best| best.length().map(|time| (best, time))) {
        Some((best, time)) if pick(time, length) == time => Some(best),
        _ => Some(other),
      };
    }
    best
  }
}

fn extreme<I: Iterator<Item = f64>>(values: I, pick: fn(f64, f64) -> f64) -> Option<f64> {
  values.fold(None, |acc, value| Some(acc.map_or(value, |acc| pick(acc, value))))
}
