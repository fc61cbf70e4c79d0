// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Jonas Reitemeyer <alumni@bmc-labs.com>
//   Florian Eich <florian@bmc-labs.com>

use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{trace, warn};


/// Upper bound for the number of sectors per lap.
pub const MAX_SECTORS: usize = u16::MAX as usize;


/// A lap derived from the markers of a session. All times in milliseconds.
///
/// `offset` is relative to the session start, sector times are relative to
/// the previous sector boundary. A lap without an end marker is `incomplete`;
/// its length is only known if the session has a duration.
#[derive(Clone, Debug, PartialEq, CopyGetters, Getters, Serialize, Deserialize)]
pub struct Lap {
  #[getset(get_copy = "pub")]
  index:      usize,
  #[getset(get_copy = "pub")]
  offset:     f64,
  #[getset(get_copy = "pub")]
  length:     Option<f64>,
  #[getset(get = "pub")]
  sectors:    Vec<Option<f64>>,
  #[getset(get_copy = "pub")]
  incomplete: bool,
  #[getset(get_copy = "pub")]
  difference: Option<f64>,
}

impl Lap {
  pub fn new(offset: f64, length: Option<f64>, sectors: Vec<Option<f64>>) -> Self {
    Self { index: 0,
           offset,
           length,
           sectors,
           incomplete: length.is_none(),
           difference: None }
  }

  fn partial(offset: f64, length: Option<f64>, sectors: Vec<Option<f64>>) -> Self {
    Self { incomplete: true,
           ..Self::new(offset, length, sectors) }
  }

  /// Whether this lap has an end marker and hence a trustworthy length.
  pub fn is_complete(&self) -> bool {
    !self.incomplete && self.length.is_some()
  }

  /// `offset + length`, or the last known sector boundary if the length is
  /// unknown.
  pub fn end_time(&self) -> f64 {
    match self.length {
      Some(length) => self.offset + length,
      None => {
        self.offset + self.sectors.iter().rev().find_map(|s| *s).unwrap_or(0.0)
      }
    }
  }

  /// Time of sector `n`, counting from 1.
  pub fn sector(&self, n: usize) -> Option<f64> {
    n.checked_sub(1)
     .and_then(|i| self.sectors.get(i).copied())
     .flatten()
  }
}

impl fmt::Display for Lap {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let show = |value: Option<f64>| match value {
      Some(value) => value.to_string(),
      None => "-".to_string(),
    };

    let sectors = self.sectors
                      .iter()
                      .map(|&s| show(s))
                      .collect::<Vec<_>>()
                      .join(", ");
    write!(f, "{} ([{}])", show(self.length), sectors)
  }
}


/// Segments a session into laps.
///
/// Markers are split into groups of `num_sectors + 1`; the first
/// `num_sectors` of each group close a sector, the last one closes the lap.
/// Without `num_sectors` there is no segmentation at all. A final group
/// lacking its lap marker yields an incomplete lap, which spans the rest of
/// the session if `duration` is known. Time after the last lap that no marker
/// accounts for becomes one more incomplete lap. More than `MAX_SECTORS`
/// sectors yield no laps.
pub fn derive_laps(markers: &[f64],
                   num_sectors: Option<usize>,
                   duration: Option<f64>)
                   -> Vec<Lap> {
  let num_sectors = match num_sectors {
    Some(num_sectors) => num_sectors,
    None => return Vec::new(),
  };
  let group_size = match num_sectors.checked_add(1) {
    Some(group_size) if num_sectors <= MAX_SECTORS => group_size,
    _ => {
      warn!(num_sectors, "too many sectors per lap, no laps derived");
      return Vec::new();
    }
  };

  let mut laps = Vec::with_capacity(markers.len() / group_size + 1);
  let mut elapsed = 0.0;

  for group in markers.chunks(group_size) {
    let mut sectors = Vec::with_capacity(group.len());
    let mut in_lap = 0.0;
    for i in 0..num_sectors {
      sectors.push(group.get(i).map(|&marker| {
                                 let sector = marker - elapsed - in_lap;
                                 in_lap += sector;
                                 sector
                               }));
    }

    match group.get(num_sectors) {
      Some(&marker) => {
        let length = marker - elapsed;
        laps.push(Lap::new(elapsed, Some(length), sectors));
        elapsed += length;
      }
      None => {
        let length = duration.map(|duration| duration - elapsed);
        laps.push(Lap::partial(elapsed, length, sectors));
      }
    }
  }

  if let Some(duration) = duration {
    let end = laps.last().map_or(0.0, Lap::end_time);
    if duration > end || laps.is_empty() {
      laps.push(Lap::partial(end, Some(duration - end), vec![None; num_sectors]));
    }
  }

  for i in 0..laps.len() {
    laps[i].index = i;
    if i > 0 {
      laps[i].difference = match (laps[i].length, laps[i - 1].length) {
        (Some(length), Some(previous)) => Some(length - previous),
        _ => None,
      };
    }
  }

  trace!(markers = markers.len(),
         num_sectors,
         laps = laps.len(),
         "derived laps");
  laps
}


#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::{assert_eq, assert_ne};
  use proptest::prelude::*;


  fn lengths(laps: &[Lap]) -> Vec<Option<f64>> {
    laps.iter().map(Lap::length).collect()
  }

  #[test]
  fn lap_test() {
    let lap = Lap::new(10.0, Some(100.0), vec![Some(20.0), Some(50.0)]);
    assert_eq!(0, lap.index());
    assert_eq!(10.0, lap.offset());
    assert_eq!(Some(100.0), lap.length());
    assert_eq!(false, lap.incomplete());
    assert_eq!(true, lap.is_complete());
    assert_eq!(110.0, lap.end_time());
    assert_eq!(Some(50.0), lap.sector(2));
    assert_eq!(None, lap.sector(0));
    assert_eq!(None, lap.sector(3));
    assert_eq!("100 ([20, 50])", &lap.to_string());

    assert_ne!(lap, Lap::new(20.0, Some(100.0), vec![Some(20.0), Some(50.0)]));
    assert_ne!(lap, Lap::new(10.0, Some(100.0), vec![Some(20.0), None]));
  }

  #[test]
  fn lap_end_time_test() {
    let lap = Lap::new(0.0, None, vec![Some(10.0), Some(20.0)]);
    assert_eq!(true, lap.incomplete());
    assert_eq!(20.0, lap.end_time());
    assert_eq!("- ([10, 20])", &lap.to_string());

    let lap = Lap::new(0.0, None, vec![]);
    assert_eq!(0.0, lap.end_time());
  }

  #[test]
  fn derive_laps_test() {
    let laps = derive_laps(&[10.0, 20.0, 30.0, 50.0, 60.0, 70.0], Some(2), None);
    assert_eq!(2, laps.len());
    assert_eq!(Lap::new(0.0, Some(30.0), vec![Some(10.0), Some(10.0)]),
               Lap { index: 0,
                     ..laps[0].clone() });
    assert_eq!(30.0, laps[1].offset());
    assert_eq!(Some(40.0), laps[1].length());
    assert_eq!(&vec![Some(20.0), Some(10.0)], laps[1].sectors());
    assert_eq!(1, laps[1].index());
    assert_eq!(Some(10.0), laps[1].difference());
    assert_eq!(None, laps[0].difference());
  }

  #[test]
  fn derive_laps_no_sectors_test() {
    let laps = derive_laps(&[10.0, 20.0, 30.0], Some(0), None);
    assert_eq!(3, laps.len());
    assert_eq!(vec![0.0, 10.0, 20.0],
               laps.iter().map(Lap::offset).collect::<Vec<_>>());
    assert_eq!(vec![10.0, 20.0, 30.0],
               laps.iter().map(Lap::end_time).collect::<Vec<_>>());
    assert!(laps.iter().all(|lap| lap.sectors().is_empty()));
    assert!(laps.iter().all(Lap::is_complete));
  }

  #[test]
  fn derive_laps_unsegmented_test() {
    assert_eq!(Vec::<Lap>::new(), derive_laps(&[10.0, 20.0, 30.0], None, None));
    assert_eq!(Vec::<Lap>::new(), derive_laps(&[10.0], None, Some(100.0)));
    assert_eq!(Vec::<Lap>::new(), derive_laps(&[], Some(2), None));
  }

  #[test]
  fn derive_laps_partial_test() {
    // the partial lap is kept, its length unknown
    let laps = derive_laps(&[10.0, 20.0, 30.0, 40.0], Some(2), None);
    assert_eq!(2, laps.len());
    assert_eq!(vec![Some(30.0), None], lengths(&laps));
    assert_eq!(&vec![Some(10.0), None], laps[1].sectors());
    assert_eq!(true, laps[1].incomplete());
    assert_eq!(30.0, laps[1].offset());
    assert_eq!(None, laps[1].difference());

    let laps = derive_laps(&[10.0, 20.0], Some(2), None);
    assert_eq!(1, laps.len());
    assert_eq!(&vec![Some(10.0), Some(10.0)], laps[0].sectors());
    assert_eq!(None, laps[0].length());
    assert_eq!(20.0, laps[0].end_time());
  }

  #[test]
  fn derive_laps_duration_test() {
    // partial lap spans the rest of the session
    let laps = derive_laps(&[10.0, 20.0, 30.0, 40.0], Some(2), Some(100.0));
    assert_eq!(vec![Some(30.0), Some(70.0)], lengths(&laps));
    assert_eq!(true, laps[1].incomplete());
    assert_eq!(false, laps[1].is_complete());
    assert_eq!(&vec![Some(10.0), None], laps[1].sectors());
    assert_eq!(Some(40.0), laps[1].difference());

    // unmarked tail becomes a synthetic lap
    let laps = derive_laps(&[10.0, 20.0, 30.0], Some(2), Some(100.0));
    assert_eq!(2, laps.len());
    assert_eq!(30.0, laps[1].offset());
    assert_eq!(Some(70.0), laps[1].length());
    assert_eq!(&vec![None, None], laps[1].sectors());
    assert_eq!(true, laps[1].incomplete());

    // a duration ending on the last marker adds nothing
    let laps = derive_laps(&[10.0, 20.0, 30.0], Some(2), Some(30.0));
    assert_eq!(1, laps.len());

    // no markers at all
    let laps = derive_laps(&[], Some(1), Some(50.0));
    assert_eq!(1, laps.len());
    assert_eq!(0.0, laps[0].offset());
    assert_eq!(Some(50.0), laps[0].length());
    assert_eq!(&vec![None], laps[0].sectors());
    assert_eq!(true, laps[0].incomplete());
  }

  #[test]
  fn derive_laps_sector_bound_test() {
    assert_eq!(Vec::<Lap>::new(), derive_laps(&[10.0], Some(usize::MAX), None));
    assert_eq!(Vec::<Lap>::new(),
               derive_laps(&[10.0], Some(4_000_000_000), Some(100.0)));
    assert_eq!(Vec::<Lap>::new(),
               derive_laps(&[10.0], Some(MAX_SECTORS + 1), None));

    let laps = derive_laps(&[10.0, 20.0], Some(MAX_SECTORS), None);
    assert_eq!(1, laps.len());
    assert_eq!(MAX_SECTORS, laps[0].sectors().len());
    assert_eq!(Some(10.0), laps[0].sector(2));
    assert_eq!(None, laps[0].sector(3));
  }

  proptest! {
    #[test]
    fn derive_laps_offsets(increments in prop::collection::vec(1u32..1_000, 0..40),
                           num_sectors in 0usize..4) {
      let mut markers = Vec::with_capacity(increments.len());
      let mut t = 0.0;
      for increment in increments {
        t += f64::from(increment);
        markers.push(t);
      }

      let laps = derive_laps(&markers, Some(num_sectors), None);
      let expected = (markers.len() + num_sectors) / (num_sectors + 1);
      prop_assert_eq!(expected, laps.len());

      let mut elapsed = 0.0;
      for (i, lap) in laps.iter().enumerate() {
        prop_assert_eq!(i, lap.index());
        prop_assert_eq!(num_sectors, lap.sectors().len());
        prop_assert!((lap.offset() - elapsed).abs() < 1e-6);
        if let Some(length) = lap.length() {
          prop_assert!(length > 0.0);
          elapsed += length;
        }
      }
    }
  }
}
