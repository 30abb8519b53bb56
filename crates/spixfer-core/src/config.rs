//! Bus configuration

use bitflags::bitflags;
use core::fmt;

/// Default maximum payload bytes per native transfer call
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 4096;

/// Default SPI clock speed in Hz (2 MHz)
pub const DEFAULT_SPEED_HZ: u32 = 2_000_000;

/// Default word size in bits
pub const DEFAULT_BITS_PER_WORD: u8 = 8;

bitflags! {
    /// Clock phase/polarity bits, using the Linux spidev encoding
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModeFlags: u8 {
        /// Sample on the trailing clock edge
        const CPHA = 0x01;
        /// Clock idles high
        const CPOL = 0x02;
    }
}

/// SPI mode (clock polarity and phase)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// CPOL=0, CPHA=0
    #[default]
    Mode0,
    /// CPOL=0, CPHA=1
    Mode1,
    /// CPOL=1, CPHA=0
    Mode2,
    /// CPOL=1, CPHA=1
    Mode3,
}

impl Mode {
    /// Phase/polarity flags for this mode
    pub fn flags(self) -> ModeFlags {
        match self {
            Mode::Mode0 => ModeFlags::empty(),
            Mode::Mode1 => ModeFlags::CPHA,
            Mode::Mode2 => ModeFlags::CPOL,
            Mode::Mode3 => ModeFlags::CPOL | ModeFlags::CPHA,
        }
    }

    /// Raw mode byte as understood by the kernel
    pub fn bits(self) -> u8 {
        self.flags().bits()
    }

    /// Build a mode from its number (0-3)
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            0 => Some(Mode::Mode0),
            1 => Some(Mode::Mode1),
            2 => Some(Mode::Mode2),
            3 => Some(Mode::Mode3),
            _ => None,
        }
    }
}

impl From<ModeFlags> for Mode {
    fn from(flags: ModeFlags) -> Self {
        match (flags.contains(ModeFlags::CPOL), flags.contains(ModeFlags::CPHA)) {
            (false, false) => Mode::Mode0,
            (false, true) => Mode::Mode1,
            (true, false) => Mode::Mode2,
            (true, true) => Mode::Mode3,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// Configuration for opening an SPI bus endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiConfig {
    /// Device name (e.g., "/dev/spidev0.0")
    pub device: String,
    /// Clock polarity and phase
    pub mode: Mode,
    /// Maximum clock speed in Hz
    pub speed_hz: u32,
    /// Bits per transfer word
    pub bits_per_word: u8,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            mode: Mode::Mode0,
            speed_hz: DEFAULT_SPEED_HZ,
            bits_per_word: DEFAULT_BITS_PER_WORD,
        }
    }
}

impl SpiConfig {
    /// Create a new configuration with the given device name
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    /// Set the SPI mode
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the SPI clock speed in Hz
    pub fn with_speed(mut self, speed_hz: u32) -> Self {
        self.speed_hz = speed_hz;
        self
    }

    /// Set the word size in bits
    pub fn with_bits_per_word(mut self, bits: u8) -> Self {
        self.bits_per_word = bits;
        self
    }
}

/// Apply the default for an unset (zero) chunk size
pub(crate) fn normalize_chunk_size(len: usize) -> usize {
    if len == 0 {
        DEFAULT_MAX_CHUNK_SIZE
    } else {
        len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_bits_match_kernel() {
        assert_eq!(Mode::Mode0.bits(), 0);
        assert_eq!(Mode::Mode1.bits(), 1);
        assert_eq!(Mode::Mode2.bits(), 2);
        assert_eq!(Mode::Mode3.bits(), 3);
    }

    #[test]
    fn test_mode_from_flags() {
        for n in 0..4 {
            let mode = Mode::from_number(n).unwrap();
            assert_eq!(Mode::from(mode.flags()), mode);
        }
        assert_eq!(Mode::from_number(4), None);
    }

    #[test]
    fn test_config_builder() {
        let config = SpiConfig::new("/dev/spidev1.0")
            .with_mode(Mode::Mode3)
            .with_speed(8_000_000)
            .with_bits_per_word(16);
        assert_eq!(config.device, "/dev/spidev1.0");
        assert_eq!(config.mode, Mode::Mode3);
        assert_eq!(config.speed_hz, 8_000_000);
        assert_eq!(config.bits_per_word, 16);
    }

    #[test]
    fn test_zero_chunk_size_uses_default() {
        assert_eq!(normalize_chunk_size(0), DEFAULT_MAX_CHUNK_SIZE);
        assert_eq!(normalize_chunk_size(17), 17);
    }
}
