//! spixfer-core - Chunked SPI transfer engine
//!
//! This crate provides a thread-safe SPI device handle that splits
//! arbitrarily long transfers into bus-limited segments, optionally prefixes
//! them with a one-byte register address, and brackets each logical
//! operation with an external chip-select.
//!
//! The actual bus is abstracted behind the [`SpiBus`] trait so that the same
//! engine drives Linux spidev, an in-memory emulator, or a test double.
//!
//! # Example
//!
//! ```ignore
//! use spixfer_core::{SpiConfig, SpiDevice, Mode};
//!
//! let mut dev: SpiDevice<SomeBus> = SpiDevice::new();
//! dev.init(&SpiConfig::new("/dev/spidev0.0").with_mode(Mode::Mode3))?;
//!
//! // Read 6 bytes starting at register 0x28
//! let mut buf = [0u8; 6];
//! dev.read_reg(0x28, &mut buf)?;
//! ```
//!
//! # Concurrency
//!
//! Transfers take `&self` and are serialized by an internal mutex, so a
//! device can be shared between threads behind an `Arc`. Initialization and
//! teardown take `&mut self` / `self` and therefore can never overlap with a
//! transfer.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod bus;
pub mod chip_select;
pub mod config;
pub mod device;
pub mod error;
pub mod segment;

#[cfg(test)]
mod testing;

pub use bus::{OpenBus, SpiBus, Transfer};
pub use chip_select::{BoxError, ChipSelect};
pub use config::{Mode, ModeFlags, SpiConfig, DEFAULT_MAX_CHUNK_SIZE};
pub use device::SpiDevice;
pub use error::{ConfigStep, Error, InvalidArgument, Result};
pub use segment::{Segment, Segments};
