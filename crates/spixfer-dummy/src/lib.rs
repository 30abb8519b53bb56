//! spixfer-dummy - In-memory SPI register device emulator
//!
//! This crate provides a dummy SPI bus with a register-file peripheral
//! behind it. It's useful for testing and development without real hardware.
//!
//! # Protocol
//!
//! The emulated peripheral follows the common sensor convention:
//!
//! - The first byte of a frame is the register address. Bit 7 set selects a
//!   read, clear selects a write.
//! - Following bytes read or write consecutive registers, wrapping within
//!   the 128-register space.
//!
//! A frame lasts while chip select is held. Without a [`DummyChipSelect`]
//! installed, every native call is its own frame, exactly like a kernel
//! driver toggling CS around each message.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use spixfer_core::chip_select::BoxError;
use spixfer_core::{ChipSelect, ConfigStep, Error, OpenBus, SpiBus, SpiConfig, Transfer};

/// Address bit selecting a register read
pub const READ_FLAG: u8 = 0x80;

/// Number of emulated registers
pub const REGISTER_COUNT: usize = 128;

/// Identification register address
pub const REG_WHO_AM_I: u8 = 0x0F;

/// Most recent native calls kept for inspection
pub const RECORDED_CALLS: usize = 256;

/// Configuration for the dummy device
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Value reported by the identification register
    pub who_am_i: u8,
    /// Only this word size is accepted when opening
    pub bits_per_word: u8,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            who_am_i: 0x33,
            bits_per_word: 8,
        }
    }
}

/// Copy of one descriptor from a native call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTransfer {
    /// Transmitted bytes, if the descriptor had a transmit buffer
    pub tx: Option<Vec<u8>>,
    /// Receive buffer length, if any
    pub rx_len: Option<usize>,
    /// Clocked length
    pub len: usize,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    addr: u8,
    read: bool,
}

#[derive(Debug)]
struct State {
    registers: [u8; REGISTER_COUNT],
    frame: Option<Frame>,
    cs_held: bool,
    calls: VecDeque<Vec<RecordedTransfer>>,
    call_count: usize,
    fail_call: Option<usize>,
}

impl State {
    fn new(config: &DummyConfig) -> Self {
        let mut registers = [0u8; REGISTER_COUNT];
        registers[REG_WHO_AM_I as usize] = config.who_am_i;
        Self {
            registers,
            frame: None,
            cs_held: false,
            calls: VecDeque::new(),
            call_count: 0,
            fail_call: None,
        }
    }

    /// Clock one byte through the emulated peripheral
    fn clock(&mut self, tx: u8) -> u8 {
        let Some(mut frame) = self.frame else {
            self.frame = Some(Frame {
                addr: tx & !READ_FLAG,
                read: tx & READ_FLAG != 0,
            });
            return 0;
        };

        let reg = &mut self.registers[frame.addr as usize];
        let rx = *reg;
        if !frame.read {
            *reg = tx;
        }
        frame.addr = (frame.addr + 1) % REGISTER_COUNT as u8;
        self.frame = Some(frame);
        rx
    }
}

/// Whether every buffer of `t` holds at least `t.len` bytes
fn buffers_cover(t: &Transfer<'_>) -> bool {
    t.tx.map_or(true, |b| b.len() >= t.len) && t.rx.as_ref().map_or(true, |b| b.len() >= t.len)
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Dummy SPI bus
///
/// Clones of the [`DummyMonitor`] and [`DummyChipSelect`] obtained from a bus
/// share its state, so tests can inspect the device after handing the bus
/// to an `SpiDevice`.
pub struct DummyBus {
    state: Arc<Mutex<State>>,
}

impl DummyBus {
    /// Create a new dummy bus with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::new(&config))),
        }
    }

    /// Create a new dummy bus with default configuration
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Handle for inspecting the emulated device
    pub fn monitor(&self) -> DummyMonitor {
        DummyMonitor {
            state: Arc::clone(&self.state),
        }
    }

    /// Chip select wired to the emulated device
    pub fn chip_select(&self) -> DummyChipSelect {
        DummyChipSelect {
            state: Arc::clone(&self.state),
        }
    }
}

impl SpiBus for DummyBus {
    fn transfer(&mut self, transfers: &mut [Transfer<'_>]) -> std::io::Result<()> {
        if !transfers.iter().all(|t| buffers_cover(t)) {
            return Err(std::io::Error::from(std::io::ErrorKind::InvalidInput));
        }

        let mut state = lock(&self.state);

        let index = state.call_count;
        state.call_count += 1;
        if state.calls.len() == RECORDED_CALLS {
            state.calls.pop_front();
        }
        state.calls.push_back(
            transfers
                .iter()
                .map(|t| RecordedTransfer {
                    tx: t.tx.map(|b| b[..t.len].to_vec()),
                    rx_len: t.rx.as_ref().map(|b| b.len()),
                    len: t.len,
                })
                .collect(),
        );

        if state.fail_call == Some(index) {
            log::debug!("dummy: Injecting failure on call {}", index);
            return Err(std::io::Error::other("injected bus fault"));
        }

        for t in transfers.iter_mut() {
            for i in 0..t.len {
                let tx = t.tx.map_or(0, |b| b[i]);
                let rx = state.clock(tx);
                if let Some(buf) = t.rx.as_deref_mut() {
                    buf[i] = rx;
                }
            }
        }

        if !state.cs_held {
            state.frame = None;
        }
        Ok(())
    }
}

impl OpenBus for DummyBus {
    fn open(config: &SpiConfig) -> spixfer_core::Result<Self> {
        let dummy = DummyConfig::default();
        if config.bits_per_word != dummy.bits_per_word {
            return Err(Error::Configure {
                step: ConfigStep::WriteBitsPerWord,
                source: std::io::Error::from(std::io::ErrorKind::InvalidInput),
            });
        }

        log::info!(
            "dummy: Opened emulated device (mode={}, speed={} kHz)",
            config.mode,
            config.speed_hz / 1000
        );
        Ok(Self::new(dummy))
    }
}

/// Chip-select line of the emulated device
pub struct DummyChipSelect {
    state: Arc<Mutex<State>>,
}

impl ChipSelect for DummyChipSelect {
    fn set(&mut self, enable: bool) -> Result<(), BoxError> {
        let mut state = lock(&self.state);
        state.cs_held = enable;
        state.frame = None;
        Ok(())
    }
}

/// Inspection handle for the emulated device
#[derive(Clone)]
pub struct DummyMonitor {
    state: Arc<Mutex<State>>,
}

impl DummyMonitor {
    /// Current register contents
    pub fn registers(&self) -> [u8; REGISTER_COUNT] {
        lock(&self.state).registers
    }

    /// Overwrite registers starting at `addr`
    pub fn load(&self, addr: u8, data: &[u8]) {
        let mut state = lock(&self.state);
        for (i, &byte) in data.iter().enumerate() {
            state.registers[(addr as usize + i) % REGISTER_COUNT] = byte;
        }
    }

    /// The most recent native calls, oldest first (at most [`RECORDED_CALLS`])
    pub fn calls(&self) -> Vec<Vec<RecordedTransfer>> {
        lock(&self.state).calls.iter().cloned().collect()
    }

    /// Number of native calls made since the bus was created
    pub fn call_count(&self) -> usize {
        lock(&self.state).call_count
    }

    /// Fail the native call with the given zero-based index
    pub fn fail_call(&self, index: usize) {
        lock(&self.state).fail_call = Some(index);
    }

    /// Whether chip select is currently asserted
    pub fn cs_held(&self) -> bool {
        lock(&self.state).cs_held
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spixfer_core::SpiDevice;

    fn open(chunk: usize, with_cs: bool) -> (SpiDevice<DummyBus>, DummyMonitor) {
        let bus = DummyBus::new_default();
        let monitor = bus.monitor();
        let cs = bus.chip_select();
        let dev = SpiDevice::with_bus(bus);
        dev.set_max_chunk_size(chunk);
        if with_cs {
            dev.set_chip_select(Some(Box::new(cs)));
        }
        (dev, monitor)
    }

    #[test]
    fn test_read_who_am_i() {
        let (dev, _) = open(0, true);
        let mut id = [0u8; 1];
        dev.read_reg(READ_FLAG | REG_WHO_AM_I, &mut id).unwrap();
        assert_eq!(id, [0x33]);
    }

    #[test]
    fn test_register_write_then_read_across_chunks() {
        let (dev, monitor) = open(3, true);
        let data: Vec<u8> = (0x10..0x1A).collect();

        dev.write_reg(0x20, &data).unwrap();
        assert_eq!(&monitor.registers()[0x20..0x2A], &data[..]);

        let mut buf = [0u8; 10];
        dev.read_reg(READ_FLAG | 0x20, &mut buf).unwrap();
        assert_eq!(&buf[..], &data[..]);
        assert!(!monitor.cs_held());
    }

    #[test]
    fn test_without_chip_select_frames_restart_per_call() {
        let (dev, monitor) = open(2, false);

        dev.write_reg(0x40, &[0xAA, 0xBB, 0x4C, 0xDD]).unwrap();

        // Second chunk starts a new frame: 0x4C is taken as an address
        let regs = monitor.registers();
        assert_eq!(&regs[0x40..0x42], &[0xAA, 0xBB]);
        assert_eq!(regs[0x4C], 0xDD);
    }

    #[test]
    fn test_duplex_reg_returns_previous_values() {
        let (dev, monitor) = open(4, true);
        monitor.load(0x50, &[1, 2, 3]);

        let mut old = [0u8; 3];
        dev.write_read_reg(0x50, &[7, 8, 9], &mut old).unwrap();

        assert_eq!(old, [1, 2, 3]);
        assert_eq!(&monitor.registers()[0x50..0x53], &[7, 8, 9]);
    }

    #[test]
    fn test_plain_write_uses_first_byte_as_address() {
        let (dev, monitor) = open(0, true);
        dev.write(&[0x05, 0xEE]).unwrap();
        assert_eq!(monitor.registers()[0x05], 0xEE);
    }

    #[test]
    fn test_injected_failure_releases_cs() {
        let (dev, monitor) = open(2, true);
        monitor.fail_call(1);

        let err = dev.write_reg(0x00, &[1, 2, 3, 4]).unwrap_err();

        assert!(matches!(err, Error::Transfer { offset: 2, .. }));
        assert_eq!(monitor.calls().len(), 2);
        assert!(!monitor.cs_held());
    }

    #[test]
    fn test_address_recorded_only_in_first_call() {
        let (dev, monitor) = open(3, true);
        let mut buf = [0u8; 5];

        dev.read_reg(READ_FLAG | 0x20, &mut buf).unwrap();

        let calls = monitor.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0][0].tx.as_deref(), Some(&[READ_FLAG | 0x20][..]));
        assert_eq!(calls[0][1].len, 3);
        assert_eq!(calls[1].len(), 1);
        assert_eq!(calls[1][0].len, 2);
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let mut bus = DummyBus::new_default();
        let monitor = bus.monitor();
        let tx = [READ_FLAG | REG_WHO_AM_I];
        let mut rx = [0u8; 1];

        let mut transfers = [Transfer {
            tx: Some(&tx[..]),
            rx: Some(&mut rx[..]),
            len: 2,
            cs_change: false,
        }];
        let err = bus.transfer(&mut transfers).unwrap_err();

        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
        assert_eq!(monitor.call_count(), 0);
    }

    #[test]
    fn test_call_log_is_bounded() {
        let (dev, monitor) = open(1, true);
        monitor.fail_call(RECORDED_CALLS + 10);

        for _ in 0..RECORDED_CALLS + 10 {
            dev.write(&[0x01]).unwrap();
        }
        assert_eq!(monitor.call_count(), RECORDED_CALLS + 10);
        assert_eq!(monitor.calls().len(), RECORDED_CALLS);

        // Failure injection counts every call, not just the retained ones
        assert!(dev.write(&[0x01]).is_err());
    }

    #[test]
    fn test_open_rejects_word_size() {
        let mut dev: SpiDevice<DummyBus> = SpiDevice::new();
        let err = dev
            .init(&SpiConfig::new("dummy").with_bits_per_word(9))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Configure {
                step: ConfigStep::WriteBitsPerWord,
                ..
            }
        ));
        assert!(!dev.is_open());

        dev.init(&SpiConfig::new("dummy")).unwrap();
        assert!(dev.is_open());
    }
}
