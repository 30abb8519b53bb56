//! Error types for Linux SPI operations

use thiserror::Error;

/// Linux SPI specific errors
#[derive(Debug, Error)]
pub enum LinuxSpiError {
    /// Opening or using the SPI device failed
    #[error(transparent)]
    Device(#[from] spixfer_core::Error),

    /// Failed to request the chip-select GPIO line
    #[cfg(feature = "gpio-cs")]
    #[error("Failed to request GPIO line {line} on {chip}: {source}")]
    GpioRequestFailed {
        chip: String,
        line: u32,
        #[source]
        source: gpiocdev::Error,
    },

    /// Failed to drive the chip-select GPIO line
    #[cfg(feature = "gpio-cs")]
    #[error("Failed to set chip-select GPIO line: {0}")]
    GpioSetFailed(#[source] gpiocdev::Error),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Device not specified
    #[error("No device specified. Use dev=/dev/spidevX.Y")]
    NoDevice,
}

/// Result type for Linux SPI operations
pub type Result<T> = std::result::Result<T, LinuxSpiError>;
