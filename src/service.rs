// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::{Fubar, Result};
use std::mem;


/// Directory inside a package holding the channel payloads.
pub const DATA_DIR: &str = "data";
pub const SAMPLES_EXTENSION: &str = "bin";
pub const TIMES_EXTENSION: &str = "tms";


/// Builds the path of a payload entry inside a package, e.g. `data/3.bin`.
pub fn entry_path(channel_id: u32, extension: &str) -> String {
  format!("{}/{}.{}", DATA_DIR, channel_id, extension)
}

/// Serializes samples as a packed array of native-endian `f32`.
pub fn f32_to_bytes(values: &[f32]) -> Vec<u8> {
  let mut bytes = Vec::with_capacity(values.len() * mem::size_of::<f32>());
  for value in values {
    bytes.extend_from_slice(&value.to_ne_bytes());
  }
  bytes
}

/// Serializes sample times as a packed array of native-endian `i32`.
pub fn i32_to_bytes(values: &[i32]) -> Vec<u8> {
  let mut bytes = Vec::with_capacity(values.len() * mem::size_of::<i32>());
  for value in values {
    bytes.extend_from_slice(&value.to_ne_bytes());
  }
  bytes
}

pub fn bytes_to_f32(bytes: &[u8]) -> Result<Vec<f32>> {
  ensure_width(bytes, mem::size_of::<f32>())?;
  Ok(bytes.chunks_exact(mem::size_of::<f32>())
          .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
          .collect())
}

pub fn bytes_to_i32(bytes: &[u8]) -> Result<Vec<i32>> {
  ensure_width(bytes, mem::size_of::<i32>())?;
  Ok(bytes.chunks_exact(mem::size_of::<i32>())
          .map(|c| i32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
          .collect())
}

fn ensure_width(bytes: &[u8], width: usize) -> Result<()> {
  ensure!(bytes.len() % width == 0,
          Fubar::Codec(format!("payload of {} bytes is not a multiple of {}",
                               bytes.len(),
                               width)));
  Ok(())
}
