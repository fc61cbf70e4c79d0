// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use std::{num, result, str};
use thiserror::Error;


/// The crate wide `Result` type, always carrying a `Fubar` on failure.
pub type Result<T> = result::Result<T, Fubar>;


/// Everything that can go wrong while reading, writing or working with a
/// session.
///
/// Errors from foreign crates are converted into one of the string carrying
/// variants (see `implement_from!` below), which keeps `Fubar` both `Clone`
/// and `PartialEq` so tests can compare errors directly.
///
/// FUBAR: Fucked Up Beyond All {Recognition, Repair, Reason}
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Fubar {
  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  #[error("length mismatch: {data} samples but {times} times")]
  LengthMismatch { data: usize, times: usize },

  #[error("out of range: {0}")]
  OutOfRange(String),

  #[error("index {index} out of bounds for length {len}")]
  IndexOutOfBounds { index: usize, len: usize },

  #[error("empty series")]
  EmptySeries,

  #[error("session contains no metadata document")]
  MissingMetadata,

  #[error("missing mandatory metadata: {0}")]
  MissingMandatoryMetadata(&'static str),

  #[error("no data found for channel {id} ({entry})")]
  ChannelDataNotFound { id: u32, entry: String },

  #[error("duplicate channel: {0}")]
  DuplicateChannel(String),

  #[error("entry '{0}' not found in package")]
  EntryNotFound(String),

  #[error("package has been closed")]
  PackageClosed,

  #[error("codec error: {0}")]
  Codec(String),

  #[error("package error: {0}")]
  Package(String),

  #[error("io error: {0}")]
  Io(String),
}


/// This macro - internal use only - generates the implementation of the
/// `From` trait for `Fubar` for a given list of types and the variant the
/// error message ends up in.
macro_rules! implement_from {
  ($($Variant:ident => $($ErrType:ty),*;)*) => {$($(
    impl From<$ErrType> for Fubar {
      fn from(error: $ErrType) -> Self {
        Fubar::$Variant(error.to_string())
      }
    }
  )*)*}
}

// here the macro is called with a list of types used in our codebase
implement_from!(Io => std::io::Error;
                Package => zip::result::ZipError;
                Codec => quick_xml::Error,
                         quick_xml::events::attributes::AttrError,
                         chrono::ParseError,
                         num::ParseIntError,
                         num::ParseFloatError,
                         str::Utf8Error,
                         std::string::FromUtf8Error;);


/// The `ensure!` macro provides and easy way to make sure a condition is true,
/// and if not, return the given `Fubar` wrapped in an `Err`. Use it as
/// follows:
///
/// ```ignore
/// fn my_function(&self) -> Result<()> {
///   ensure!(self.has_enough_fish(), Fubar::EmptySeries);
/// }
/// ```
#[macro_export]
macro_rules! ensure {
  ($cond:expr, $err:expr) => {
    if !($cond) {
      return Err($err);
    }
  };
}
