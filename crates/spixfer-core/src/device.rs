//! SPI device handle and transfer engine
//!
//! [`SpiDevice`] owns an open bus, the chip-select hook and the chunk size
//! behind one mutex. All six transfer operations funnel into a single
//! routine that:
//!
//! 1. takes the lock,
//! 2. allocates zero-padded scratch buffers for full-duplex requests,
//! 3. asserts chip select,
//! 4. clocks the payload in segments of at most `max_chunk_size` bytes,
//!    sending the register address (if any) together with the first one,
//! 5. releases chip select, even when a segment failed,
//! 6. copies full-duplex results back to the caller.
//!
//! When a read fails part way through, earlier segments have already been
//! written into the caller's buffer and are left there; their contents are
//! unspecified. Full-duplex requests never touch the caller's buffer on
//! failure.

use std::collections::TryReserveError;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::bus::{OpenBus, SpiBus, Transfer};
use crate::chip_select::ChipSelect;
use crate::config::{normalize_chunk_size, SpiConfig};
use crate::error::{Error, InvalidArgument, Result};
use crate::segment::{Segment, Segments};

/// What a logical transfer moves, and in which direction
enum Payload<'a> {
    Write(&'a [u8]),
    Read(&'a mut [u8]),
    Duplex { write: &'a [u8], read: &'a mut [u8] },
}

/// Borrowed views the segmentation loop slices from
struct Buffers<'a> {
    tx: Option<&'a [u8]>,
    rx: Option<&'a mut [u8]>,
}

struct Inner<B> {
    bus: Option<B>,
    chip_select: Option<Box<dyn ChipSelect>>,
    /// Zero only until the first init/attach or explicit setting
    max_chunk_size: usize,
}

/// Thread-safe handle to one SPI bus + chip-select line
///
/// Transfers borrow the device shared and are serialized end to end,
/// including the chip-select bracket. Opening, re-opening and closing need
/// exclusive access and so can never race a transfer.
pub struct SpiDevice<B> {
    inner: Mutex<Inner<B>>,
}

impl<B> Default for SpiDevice<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> SpiDevice<B> {
    /// Create an empty handle with no open bus
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                bus: None,
                chip_select: None,
                max_chunk_size: 0,
            }),
        }
    }

    /// Create a handle around an already opened bus
    pub fn with_bus(bus: B) -> Self {
        let mut dev = Self::new();
        dev.attach(bus);
        dev
    }

    fn lock(&self) -> MutexGuard<'_, Inner<B>> {
        // A panicking chip-select hook must not brick the device
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn inner_mut(&mut self) -> &mut Inner<B> {
        self.inner.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install an already opened bus, closing any previous one
    pub fn attach(&mut self, bus: B) {
        let inner = self.inner_mut();
        inner.bus = Some(bus);
        inner.max_chunk_size = normalize_chunk_size(inner.max_chunk_size);
    }

    /// Close the bus, leaving the handle uninitialized
    ///
    /// Returns the bus that was open, if any.
    pub fn detach(&mut self) -> Option<B> {
        self.inner_mut().bus.take()
    }

    /// Close the bus and drop the handle
    pub fn close(mut self) {
        if self.detach().is_some() {
            log::debug!("spixfer: Closed SPI device");
        }
    }

    /// Whether a bus is currently open
    pub fn is_open(&self) -> bool {
        self.lock().bus.is_some()
    }

    /// Install or remove the external chip-select hook
    ///
    /// With `None`, chip select is left to the bus driver, which toggles it
    /// around every native call. Devices that need CS held across a whole
    /// multi-chunk operation should install a hook.
    pub fn set_chip_select(&self, chip_select: Option<Box<dyn ChipSelect>>) {
        self.lock().chip_select = chip_select;
    }

    /// Set the maximum payload bytes per native call (0 selects the default)
    pub fn set_max_chunk_size(&self, len: usize) {
        let len = normalize_chunk_size(len);
        self.lock().max_chunk_size = len;
        log::debug!("spixfer: Max chunk size set to {} bytes", len);
    }

    /// Current chunk size, or the default if none was set yet
    pub fn max_chunk_size(&self) -> usize {
        normalize_chunk_size(self.lock().max_chunk_size)
    }
}

impl<B: OpenBus> SpiDevice<B> {
    /// Open and configure the bus named in `config`
    ///
    /// Any previously open bus is closed first. If opening or configuring
    /// fails, the handle is left without an open bus.
    pub fn init(&mut self, config: &SpiConfig) -> Result<()> {
        if self.detach().is_some() {
            log::debug!("spixfer: Closed previous bus before re-init");
        }

        log::debug!(
            "spixfer: Opening {} (mode={}, speed={} Hz, bits={})",
            config.device,
            config.mode,
            config.speed_hz,
            config.bits_per_word
        );
        let bus = B::open(config)?;
        self.attach(bus);
        Ok(())
    }
}

impl<B: SpiBus> SpiDevice<B> {
    /// Write `data`
    pub fn write(&self, data: &[u8]) -> Result<()> {
        check_write(data)?;
        self.run(None, Payload::Write(data))
    }

    /// Fill `buf` with data read from the device
    pub fn read(&self, buf: &mut [u8]) -> Result<()> {
        check_read(buf)?;
        self.run(None, Payload::Read(buf))
    }

    /// Full-duplex transfer
    ///
    /// `max(write.len(), read.len())` bytes are clocked. If `write` is the
    /// shorter side, zeros are transmitted after it; if `read` is shorter,
    /// the surplus received bytes are dropped.
    pub fn write_read(&self, write: &[u8], read: &mut [u8]) -> Result<()> {
        check_write(write)?;
        check_read(read)?;
        self.run(None, Payload::Duplex { write, read })
    }

    /// Write `data` to register `addr`
    pub fn write_reg(&self, addr: u8, data: &[u8]) -> Result<()> {
        check_write(data)?;
        self.run(Some(addr), Payload::Write(data))
    }

    /// Read register `addr` into `buf`
    pub fn read_reg(&self, addr: u8, buf: &mut [u8]) -> Result<()> {
        check_read(buf)?;
        self.run(Some(addr), Payload::Read(buf))
    }

    /// Full-duplex transfer after sending register address `addr`
    ///
    /// The byte received while the address is clocked out is discarded.
    pub fn write_read_reg(&self, addr: u8, write: &[u8], read: &mut [u8]) -> Result<()> {
        check_write(write)?;
        check_read(read)?;
        self.run(Some(addr), Payload::Duplex { write, read })
    }

    fn run(&self, address: Option<u8>, payload: Payload<'_>) -> Result<()> {
        let mut guard = self.lock();
        let inner = &mut *guard;

        let bus = inner.bus.as_mut().ok_or(Error::NotInitialized)?;
        let max_chunk = inner.max_chunk_size;
        debug_assert!(max_chunk > 0);

        match payload {
            Payload::Write(data) => with_chip_select(&mut inner.chip_select, || {
                let buffers = Buffers {
                    tx: Some(data),
                    rx: None,
                };
                clock(bus, address, data.len(), max_chunk, buffers)
            }),
            Payload::Read(buf) => with_chip_select(&mut inner.chip_select, || {
                let len = buf.len();
                let buffers = Buffers {
                    tx: None,
                    rx: Some(buf),
                };
                clock(bus, address, len, max_chunk, buffers)
            }),
            Payload::Duplex { write, read } => {
                let len = write.len().max(read.len());
                let tx = scratch(len, write).map_err(|_| Error::Allocation { len })?;
                let mut rx = scratch(len, &[]).map_err(|_| Error::Allocation { len })?;

                with_chip_select(&mut inner.chip_select, || {
                    let buffers = Buffers {
                        tx: Some(&tx),
                        rx: Some(&mut rx),
                    };
                    clock(bus, address, len, max_chunk, buffers)
                })?;

                read.copy_from_slice(&rx[..read.len()]);
                Ok(())
            }
        }
    }
}

fn check_write(data: &[u8]) -> Result<()> {
    if data.is_empty() {
        return Err(Error::InvalidArgument(InvalidArgument::EmptyWrite));
    }
    Ok(())
}

fn check_read(buf: &[u8]) -> Result<()> {
    if buf.is_empty() {
        return Err(Error::InvalidArgument(InvalidArgument::EmptyRead));
    }
    Ok(())
}

/// Zero-filled buffer of `len` bytes starting with `head`
fn scratch(len: usize, head: &[u8]) -> std::result::Result<Vec<u8>, TryReserveError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)?;
    buf.extend_from_slice(head);
    buf.resize(len, 0);
    Ok(buf)
}

/// Run `f` between chip-select assert and release
///
/// Failing to assert aborts before `f` runs. Failing to release is only
/// logged.
fn with_chip_select<F>(chip_select: &mut Option<Box<dyn ChipSelect>>, f: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    let Some(cs) = chip_select.as_mut() else {
        return f();
    };

    cs.set(true).map_err(Error::ChipSelect)?;
    let result = f();
    if let Err(e) = cs.set(false) {
        log::warn!("spixfer: Failed to release chip select: {}", e);
    }
    result
}

/// Clock `total` payload bytes through `bus` in bounded segments
fn clock<B: SpiBus + ?Sized>(
    bus: &mut B,
    address: Option<u8>,
    total: usize,
    max_chunk: usize,
    mut buffers: Buffers<'_>,
) -> Result<()> {
    let mut segments = Segments::new(total, max_chunk, address);

    for segment in segments.by_ref() {
        let range = segment.range();
        let data = match (buffers.tx, buffers.rx.as_deref_mut()) {
            (Some(tx), Some(rx)) => Transfer::duplex(&tx[range.clone()], &mut rx[range.clone()]),
            (Some(tx), None) => Transfer::write(&tx[range.clone()]),
            (None, Some(rx)) => Transfer::read(&mut rx[range.clone()]),
            // Clocks zeros and discards the result
            (None, None) => Transfer {
                tx: None,
                rx: None,
                len: segment.len(),
                cs_change: false,
            },
        };

        let result = match segment {
            Segment::Plain { .. } => {
                log::trace!("spixfer: Segment {:?}", range);
                bus.transfer(&mut [data])
            }
            Segment::WithAddress { addr, .. } => {
                log::trace!("spixfer: Segment {:?} after address 0x{:02X}", range, addr);
                let addr = [addr];
                bus.transfer(&mut [Transfer::write(&addr), data])
            }
        };

        result.map_err(|source| Error::Transfer {
            offset: range.start,
            len: range.len(),
            source,
        })?;
    }

    match segments.remaining() {
        0 => Ok(()),
        remaining => Err(Error::Incomplete { remaining }),
    }
}
