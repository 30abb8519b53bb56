//! GPIO chip select
//!
//! Drives a chip-select line through the GPIO character device (gpiocdev),
//! so CS stays asserted across every chunk of a long transfer. The spidev
//! controller's own CS should be left unconnected, or be a different pin,
//! when this is used.

use crate::error::{LinuxSpiError, Result};

use gpiocdev::line::{Offset, Value};
use gpiocdev::request::{Config, Request};
use spixfer_core::{BoxError, ChipSelect};

/// Configuration for a GPIO chip-select line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpioCsConfig {
    /// GPIO chip path (e.g., "/dev/gpiochip0")
    pub chip: String,
    /// Line offset on the chip
    pub line: Offset,
    /// Line is driven high to select the device (default: active low)
    pub active_high: bool,
}

impl GpioCsConfig {
    /// Active-low chip select on `line` of `chip`
    pub fn new(chip: impl Into<String>, line: Offset) -> Self {
        Self {
            chip: chip.into(),
            line,
            active_high: false,
        }
    }

    /// Select the device by driving the line high
    pub fn with_active_high(mut self, active_high: bool) -> Self {
        self.active_high = active_high;
        self
    }

    /// Physical line level for a logical chip-select state
    fn level(&self, asserted: bool) -> Value {
        if asserted == self.active_high {
            Value::Active
        } else {
            Value::Inactive
        }
    }
}

/// Chip select backed by a requested GPIO line
pub struct GpioChipSelect {
    request: Request,
    config: GpioCsConfig,
}

impl GpioChipSelect {
    /// Request the line as an output, initially de-asserted
    pub fn open(config: &GpioCsConfig) -> Result<Self> {
        log::debug!(
            "gpio_cs: Requesting line {} on {} (active {})",
            config.line,
            config.chip,
            if config.active_high { "high" } else { "low" }
        );

        let mut req_config = Config::default();
        req_config
            .with_line(config.line)
            .as_output(config.level(false));

        let request = Request::from_config(req_config)
            .on_chip(&config.chip)
            .with_consumer("spixfer")
            .request()
            .map_err(|e| LinuxSpiError::GpioRequestFailed {
                chip: config.chip.clone(),
                line: config.line,
                source: e,
            })?;

        Ok(Self {
            request,
            config: config.clone(),
        })
    }
}

impl ChipSelect for GpioChipSelect {
    fn set(&mut self, enable: bool) -> std::result::Result<(), BoxError> {
        match self
            .request
            .set_value(self.config.line, self.config.level(enable))
        {
            Ok(_) => Ok(()),
            Err(e) => Err(LinuxSpiError::GpioSetFailed(e).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_low_levels() {
        let config = GpioCsConfig::new("/dev/gpiochip0", 8);
        assert_eq!(config.level(true), Value::Inactive);
        assert_eq!(config.level(false), Value::Active);
    }

    #[test]
    fn test_active_high_levels() {
        let config = GpioCsConfig::new("/dev/gpiochip0", 8).with_active_high(true);
        assert_eq!(config.level(true), Value::Active);
        assert_eq!(config.level(false), Value::Inactive);
    }

    #[test]
    fn test_missing_chip_is_reported() {
        let config = GpioCsConfig::new("/nonexistent/gpiochip7", 3);
        let err = GpioChipSelect::open(&config).err().unwrap();
        assert!(matches!(
            err,
            LinuxSpiError::GpioRequestFailed { line: 3, .. }
        ));
    }
}
