//! spixfer-linux - Linux spidev support
//!
//! This crate provides the Linux bus driver for spixfer via the
//! `/dev/spidevX.Y` device interface, plus an optional GPIO-driven chip
//! select.
//!
//! # Overview
//!
//! The Linux SPI driver exposes SPI controllers through character devices
//! at `/dev/spidevX.Y` where X is the bus number and Y is the chip select.
//! The controller toggles its chip select around every ioctl message, so
//! long transfers split into several chunks see CS released in between.
//! Peripherals that need CS held for the whole operation should use a
//! [`GpioChipSelect`] (feature `gpio-cs`) on a spare line instead.
//!
//! # Example
//!
//! ```no_run
//! use spixfer_core::{Mode, SpiConfig, SpiDevice};
//! use spixfer_linux::Spidev;
//!
//! let mut dev: SpiDevice<Spidev> = SpiDevice::new();
//! dev.init(
//!     &SpiConfig::new("/dev/spidev0.0")
//!         .with_speed(4_000_000)
//!         .with_mode(Mode::Mode3),
//! )?;
//!
//! let mut id = [0u8; 1];
//! dev.read_reg(0x80 | 0x0F, &mut id)?;
//! println!("WHO_AM_I: {:02X}", id[0]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with spidev support enabled (`CONFIG_SPI_SPIDEV`)
//! - Read/write access to `/dev/spidevX.Y` device
//! - May require adding user to `spi` group or using udev rules

pub mod error;
#[cfg(feature = "gpio-cs")]
pub mod gpio_cs;
pub mod spidev;

// Re-exports
pub use error::{LinuxSpiError, Result};
#[cfg(feature = "gpio-cs")]
pub use gpio_cs::{GpioChipSelect, GpioCsConfig};
pub use spidev::{kernel_buf_size, recommended_chunk_size, Spidev};

use spixfer_core::{Mode, SpiConfig, SpiDevice};

/// Everything needed to open a spidev device from an option string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinuxSpiOptions {
    /// Bus configuration
    pub config: SpiConfig,
    /// Chunk size override; `None` picks one from the kernel buffer size
    pub chunk: Option<usize>,
    /// External chip-select line
    #[cfg(feature = "gpio-cs")]
    pub chip_select: Option<GpioCsConfig>,
}

/// Parse programmer options from a list of key-value pairs
///
/// # Options
///
/// - `dev=/dev/spidev0.0` - Required: device path
/// - `spispeed=4000` - Optional: speed in kHz (default: 2000)
/// - `mode=0` - Optional: SPI mode 0-3 (default: 0)
/// - `bits=8` - Optional: bits per word (default: 8)
/// - `chunk=4095` - Optional: bytes per ioctl message
/// - `cs_chip=/dev/gpiochip0,cs_line=25` - Optional: GPIO chip select
/// - `cs_active_high=1` - Optional: GPIO chip select polarity
pub fn parse_options(options: &[(&str, &str)]) -> Result<LinuxSpiOptions> {
    let mut config = SpiConfig::default();
    let mut chunk = None;
    #[cfg(feature = "gpio-cs")]
    let (mut cs_chip, mut cs_line, mut cs_active_high) = (None, None, false);

    for (key, value) in options {
        match *key {
            "dev" => {
                config.device = value.to_string();
            }
            "spispeed" => {
                let speed_khz: u32 = value
                    .parse()
                    .map_err(|_| invalid(format!("Invalid spispeed value: {}", value)))?;
                config.speed_hz = speed_khz
                    .checked_mul(1000)
                    .ok_or_else(|| invalid(format!("spispeed too large: {}", value)))?;
            }
            "mode" => {
                let mode: u8 = value
                    .parse()
                    .map_err(|_| invalid(format!("Invalid mode value: {}", value)))?;
                config.mode = Mode::from_number(mode)
                    .ok_or_else(|| invalid(format!("Invalid SPI mode: {} (must be 0-3)", mode)))?;
            }
            "bits" => {
                config.bits_per_word = value
                    .parse()
                    .map_err(|_| invalid(format!("Invalid bits value: {}", value)))?;
            }
            "chunk" => {
                chunk = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| invalid(format!("Invalid chunk value: {}", value)))?,
                );
            }
            #[cfg(feature = "gpio-cs")]
            "cs_chip" => {
                cs_chip = Some(value.to_string());
            }
            #[cfg(feature = "gpio-cs")]
            "cs_line" => {
                cs_line = Some(
                    value
                        .parse::<u32>()
                        .map_err(|_| invalid(format!("Invalid cs_line value: {}", value)))?,
                );
            }
            #[cfg(feature = "gpio-cs")]
            "cs_active_high" => {
                cs_active_high = matches!(*value, "1" | "true" | "yes");
            }
            _ => {
                log::warn!("linux_spi: Unknown option: {}={}", key, value);
            }
        }
    }

    if config.device.is_empty() {
        return Err(LinuxSpiError::NoDevice);
    }

    #[cfg(feature = "gpio-cs")]
    let chip_select = match (cs_chip, cs_line) {
        (Some(chip), Some(line)) => {
            Some(GpioCsConfig::new(chip, line).with_active_high(cs_active_high))
        }
        (None, None) => None,
        _ => {
            return Err(invalid(
                "cs_chip and cs_line must be given together".to_string(),
            ))
        }
    };

    Ok(LinuxSpiOptions {
        config,
        chunk,
        #[cfg(feature = "gpio-cs")]
        chip_select,
    })
}

fn invalid(message: String) -> LinuxSpiError {
    LinuxSpiError::InvalidParameter(message)
}

/// Open and configure a spidev device from parsed options
pub fn open(options: &LinuxSpiOptions) -> Result<SpiDevice<Spidev>> {
    let mut dev = SpiDevice::new();
    dev.set_max_chunk_size(options.chunk.unwrap_or_else(recommended_chunk_size));
    dev.init(&options.config)?;

    #[cfg(feature = "gpio-cs")]
    if let Some(cs) = &options.chip_select {
        dev.set_chip_select(Some(Box::new(GpioChipSelect::open(cs)?)));
    }

    Ok(dev)
}

/// Open a Linux SPI device from programmer string options
///
/// This is a convenience function for use in the CLI programmer dispatch.
pub fn open_linux_spi(
    options: &[(&str, &str)],
) -> std::result::Result<SpiDevice<Spidev>, Box<dyn std::error::Error>> {
    let options = parse_options(options)?;
    Ok(open(&options)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let opts = parse_options(&[("dev", "/dev/spidev0.0")]).unwrap();
        assert_eq!(opts.config.device, "/dev/spidev0.0");
        assert_eq!(opts.config.speed_hz, 2_000_000);
        assert_eq!(opts.config.mode, Mode::Mode0);
        assert_eq!(opts.config.bits_per_word, 8);
        assert_eq!(opts.chunk, None);
    }

    #[test]
    fn test_parse_all_bus_options() {
        let opts = parse_options(&[
            ("dev", "/dev/spidev1.2"),
            ("spispeed", "8000"),
            ("mode", "3"),
            ("bits", "16"),
            ("chunk", "64"),
        ])
        .unwrap();
        assert_eq!(opts.config.speed_hz, 8_000_000);
        assert_eq!(opts.config.mode, Mode::Mode3);
        assert_eq!(opts.config.bits_per_word, 16);
        assert_eq!(opts.chunk, Some(64));
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert!(matches!(parse_options(&[]), Err(LinuxSpiError::NoDevice)));
        assert!(parse_options(&[("dev", "/dev/spidev0.0"), ("mode", "4")]).is_err());
        assert!(parse_options(&[("dev", "/dev/spidev0.0"), ("spispeed", "fast")]).is_err());
        assert!(parse_options(&[("dev", "/dev/spidev0.0"), ("chunk", "-1")]).is_err());
    }

    #[cfg(feature = "gpio-cs")]
    #[test]
    fn test_parse_gpio_chip_select() {
        let opts = parse_options(&[
            ("dev", "/dev/spidev0.0"),
            ("cs_chip", "/dev/gpiochip0"),
            ("cs_line", "25"),
            ("cs_active_high", "1"),
        ])
        .unwrap();
        assert_eq!(
            opts.chip_select,
            Some(GpioCsConfig::new("/dev/gpiochip0", 25).with_active_high(true))
        );

        let err = parse_options(&[("dev", "/dev/spidev0.0"), ("cs_line", "25")]).unwrap_err();
        assert!(err.to_string().contains("together"));
    }

    #[test]
    fn test_open_missing_device_reports_path() {
        let opts = parse_options(&[("dev", "/nonexistent/spidev3.1")]).unwrap();
        let err = open(&opts).err().unwrap();
        assert!(err.to_string().contains("/nonexistent/spidev3.1"));
    }
}
