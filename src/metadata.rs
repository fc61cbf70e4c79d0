// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::{Fubar, Result};
use chrono::{Local, NaiveDateTime, Timelike};
use getset::{CopyGetters, Getters, MutGetters, Setters};
use serde::{Deserialize, Serialize};
use std::fmt;


/// Where a session was recorded.
#[derive(Clone,
         Debug,
         Default,
         PartialEq,
         Getters,
         MutGetters,
         Setters,
         Serialize,
         Deserialize)]
#[getset(get = "pub", get_mut = "pub", set = "pub")]
pub struct Venue {
  /// mandatory for writing
  name:          Option<String>,
  configuration: Option<String>,
}

impl Venue {
  pub fn new(name: &str) -> Self {
    Self { name:          Some(name.to_string()),
           configuration: None, }
  }

  pub fn with_configuration(mut self, configuration: &str) -> Self {
    self.configuration = Some(configuration.to_string());
    self
  }
}

impl fmt::Display for Venue {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self.name.as_deref().unwrap_or("-"))?;
    if let Some(configuration) = &self.configuration {
      write!(f, " ({})", configuration)?;
    }
    Ok(())
  }
}


/// What a session was recorded with.
#[derive(Clone,
         Debug,
         Default,
         PartialEq,
         Getters,
         MutGetters,
         Setters,
         Serialize,
         Deserialize)]
#[getset(get = "pub", get_mut = "pub", set = "pub")]
pub struct Vehicle {
  /// mandatory for writing
  name:     Option<String>,
  year:     Option<String>,
  category: Option<String>,
  comments: Option<String>,
}

impl Vehicle {
  pub fn new(name: &str) -> Self {
    Self { name: Some(name.to_string()),
           ..Self::default() }
  }

  pub fn with_year(mut self, year: &str) -> Self {
    self.year = Some(year.to_string());
    self
  }

  pub fn with_category(mut self, category: &str) -> Self {
    self.category = Some(category.to_string());
    self
  }
}


/// Descriptive information about a session.
///
/// The date carries no sub-second component, it is truncated whenever it is
/// set. `duration` (in milliseconds) is the total session length and takes
/// part in lap derivation.
#[derive(Clone,
         Debug,
         PartialEq,
         CopyGetters,
         Getters,
         MutGetters,
         Serialize,
         Deserialize)]
pub struct Metadata {
  #[getset(get = "pub", get_mut = "pub")]
  user:       Option<String>,
  #[getset(get = "pub", get_mut = "pub")]
  venue:      Venue,
  #[getset(get = "pub", get_mut = "pub")]
  vehicle:    Vehicle,
  #[getset(get_copy = "pub")]
  date:       NaiveDateTime,
  #[getset(get = "pub", get_mut = "pub")]
  comments:   Option<String>,
  #[getset(get = "pub", get_mut = "pub")]
  datasource: Option<String>,
  #[getset(get_copy = "pub")]
  duration:   Option<f64>,
}

impl Metadata {
  pub fn new(venue: Venue, vehicle: Vehicle, date: NaiveDateTime) -> Self {
    Self { user: None,
           venue,
           vehicle,
           date: truncate(date),
           comments: None,
           datasource: None,
           duration: None }
  }

  pub fn with_user(mut self, user: &str) -> Self {
    self.user = Some(user.to_string());
    self
  }

  pub fn with_duration(mut self, duration: f64) -> Self {
    self.duration = Some(duration);
    self
  }

  pub fn set_date(&mut self, date: NaiveDateTime) -> &mut Self {
    self.date = truncate(date);
    self
  }

  pub fn set_duration(&mut self, duration: Option<f64>) -> &mut Self {
    self.duration = duration;
    self
  }

  /// Makes sure everything needed to write a session is there.
  pub fn validate(&self) -> Result<()> {
    ensure!(is_set(&self.venue.name),
            Fubar::MissingMandatoryMetadata("venue name"));
    ensure!(is_set(&self.vehicle.name),
            Fubar::MissingMandatoryMetadata("vehicle name"));
    Ok(())
  }
}

impl Default for Metadata {
  fn default() -> Self {
    Self::new(Venue::default(),
              Vehicle::default(),
              Local::now().naive_local())
  }
}

impl fmt::Display for Metadata {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f,
           "{} at {} ({})",
           self.user.as_deref().unwrap_or("-"),
           self.venue,
           self.date)
  }
}

fn truncate(date: NaiveDateTime) -> NaiveDateTime {
  date.with_nanosecond(0).unwrap_or(date)
}

fn is_set(value: &Option<String>) -> bool {
  value.as_deref().map_or(false, |v| !v.trim().is_empty())
}


#[cfg(test)]
mod tests {
  use super::*;
  use chrono::NaiveDate;
  use pretty_assertions::{assert_eq, assert_ne};


  fn date() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2010, 7, 11).unwrap()
                                        .and_hms_milli_opt(13, 37, 42, 512)
                                        .unwrap()
  }

  fn metadata() -> Metadata {
    Metadata::new(Venue::new("Silverstone").with_configuration("Arena GP"),
                  Vehicle::new("Mercedes MGP W01").with_year("2010")
                                                  .with_category("Formula One"),
                  date()).with_user("Michael Schumacher")
  }

  #[test]
  fn metadata_test() {
    let mut metadata = metadata();
    assert_eq!(&Some("Michael Schumacher".to_string()), metadata.user());
    assert_eq!(&Some("Silverstone".to_string()), metadata.venue().name());
    assert_eq!(&Some("2010".to_string()), metadata.vehicle().year());
    assert_eq!(&None, metadata.vehicle().comments());
    assert_eq!(0, metadata.date().nanosecond());
    assert_eq!(42, metadata.date().second());
    assert_eq!(None, metadata.duration());
    assert_eq!("Michael Schumacher at Silverstone (Arena GP) (2010-07-11 13:37:42)",
               &metadata.to_string());

    let other = metadata.clone();
    metadata.vehicle_mut()
            .set_comments(Some("Eight-time world champion car".to_string()));
    metadata.set_duration(Some(1_000.0));
    assert_eq!(Some(1_000.0), metadata.duration());
    assert_ne!(other, metadata);
  }

  #[test]
  fn validate_test() {
    assert_eq!(Ok(()), metadata().validate());

    let mut metadata = metadata();
    metadata.venue_mut().set_name(None);
    assert_eq!(Err(Fubar::MissingMandatoryMetadata("venue name")),
               metadata.validate());

    let mut metadata = self::metadata();
    metadata.vehicle_mut().set_name(Some("  ".to_string()));
    assert_eq!(Err(Fubar::MissingMandatoryMetadata("vehicle name")),
               metadata.validate());

    assert!(Metadata::default().validate().is_err());
    assert_eq!("- at - (", &Metadata::default().to_string()[..8]);
  }
}
