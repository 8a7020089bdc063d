#![cfg_attr(not(test), no_std)]

#[cfg(test)]
extern crate core;
extern crate byteorder;
#[macro_use]
extern crate log;

pub mod regs;
pub mod error;
pub mod hal;
pub mod sysref;
pub mod fifo;
pub mod dtc;
pub mod marker;
pub mod latency;
pub mod mts;
pub mod config;

#[cfg(test)]
mod sim;

pub use error::{ErrorMask, Timeout};
pub use hal::{Block, Capabilities, Converter, ConverterKind, Hal, Registers, Tile, TileSet};
pub use mts::SyncConfig;
