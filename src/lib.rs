// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

#[macro_use]
mod fubar;
mod channel;
pub mod codec;
mod lap;
mod lazy;
mod metadata;
mod service;
mod session;
mod store;
mod time;
mod timeseries;
mod timing;
mod xml;

pub use channel::{Channel, ChannelSeries};
pub use fubar::{Fubar, Result};
pub use lap::{derive_laps, Lap, MAX_SECTORS};
pub use lazy::{ChannelSource, LazyTimeSeries, Payload, SeriesKind};
pub use metadata::{Metadata, Vehicle, Venue};
pub use session::Session;
pub use store::{ArchiveOptions,
                ArchiveWriter,
                Compression,
                MemoryPackage,
                PackageSink,
                PackageStore,
                ZipPackage};
pub use time::{Epoch, Frequency, BASE_TIME};
pub use timeseries::{TimeSeries, UniformTimeSeries, VariableTimeSeries};
