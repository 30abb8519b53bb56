//! Bus driver traits
//!
//! A bus driver exposes one primitive: an atomic message made of one or more
//! [`Transfer`] descriptors, clocked back to back. The engine never issues
//! more than two descriptors per message (address byte plus data).

use crate::config::SpiConfig;
use crate::error::Result;

/// One native transfer descriptor
///
/// Mirrors the kernel's `spi_ioc_transfer`: a transmit buffer, a receive
/// buffer, or both, plus an explicit length. A missing transmit buffer
/// clocks out zeros, a missing receive buffer discards incoming data.
#[derive(Debug)]
pub struct Transfer<'a> {
    /// Bytes to transmit, or `None` to send zeros
    pub tx: Option<&'a [u8]>,
    /// Buffer for received bytes, or `None` to discard them
    pub rx: Option<&'a mut [u8]>,
    /// Number of bytes clocked
    pub len: usize,
    /// Ask the driver to toggle CS after this descriptor
    pub cs_change: bool,
}

impl<'a> Transfer<'a> {
    /// Transmit-only descriptor
    pub fn write(tx: &'a [u8]) -> Self {
        Self {
            len: tx.len(),
            tx: Some(tx),
            rx: None,
            cs_change: false,
        }
    }

    /// Receive-only descriptor
    pub fn read(rx: &'a mut [u8]) -> Self {
        Self {
            len: rx.len(),
            tx: None,
            rx: Some(rx),
            cs_change: false,
        }
    }

    /// Full-duplex descriptor; both buffers must have the same length
    pub fn duplex(tx: &'a [u8], rx: &'a mut [u8]) -> Self {
        debug_assert_eq!(tx.len(), rx.len());
        Self {
            len: tx.len().min(rx.len()),
            tx: Some(tx),
            rx: Some(rx),
            cs_change: false,
        }
    }
}

/// An open SPI bus endpoint
pub trait SpiBus: Send {
    /// Clock all descriptors as one message
    ///
    /// Implementations must not return until the whole message has been
    /// transferred or has failed.
    fn transfer(&mut self, transfers: &mut [Transfer<'_>]) -> std::io::Result<()>;
}

/// A bus that can be opened and configured from a [`SpiConfig`]
///
/// `open` performs every configuration step; on failure any endpoint it
/// opened must be closed again before returning.
pub trait OpenBus: SpiBus + Sized {
    /// Open and configure the endpoint named by `config.device`
    fn open(config: &SpiConfig) -> Result<Self>;
}

impl<B: SpiBus + ?Sized> SpiBus for Box<B> {
    fn transfer(&mut self, transfers: &mut [Transfer<'_>]) -> std::io::Result<()> {
        (**self).transfer(transfers)
    }
}
