//! Error types for spixfer-core

use core::fmt;
use thiserror::Error;

use crate::chip_select::BoxError;

/// Which argument of a transfer request was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidArgument {
    /// Write data is empty
    EmptyWrite,
    /// Read buffer is empty
    EmptyRead,
}

impl fmt::Display for InvalidArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyWrite => write!(f, "write data is empty"),
            Self::EmptyRead => write!(f, "read buffer is empty"),
        }
    }
}

/// Bus configuration steps performed while opening a device
///
/// Each step is a separate driver call and may fail on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigStep {
    /// Set the transmit SPI mode
    WriteMode,
    /// Read back the SPI mode
    ReadMode,
    /// Set the maximum clock speed
    WriteSpeed,
    /// Read back the maximum clock speed
    ReadSpeed,
    /// Set the word size
    WriteBitsPerWord,
    /// Read back the word size
    ReadBitsPerWord,
}

impl fmt::Display for ConfigStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WriteMode => "set mode",
            Self::ReadMode => "read mode",
            Self::WriteSpeed => "set max speed",
            Self::ReadSpeed => "read max speed",
            Self::WriteBitsPerWord => "set bits per word",
            Self::ReadBitsPerWord => "read bits per word",
        };
        f.write_str(name)
    }
}

/// Errors returned by the device handle and transfer engine
#[derive(Debug, Error)]
pub enum Error {
    /// A transfer argument was rejected before touching the bus
    #[error("Invalid argument: {0}")]
    InvalidArgument(InvalidArgument),

    /// The device has no open bus
    #[error("SPI device is not initialized")]
    NotInitialized,

    /// Asserting chip select failed
    #[error("Chip select assertion failed: {0}")]
    ChipSelect(#[source] BoxError),

    /// A native transfer call failed
    #[error("SPI transfer of {len} bytes at offset {offset} failed: {source}")]
    Transfer {
        /// Payload offset of the failing segment
        offset: usize,
        /// Payload length of the failing segment
        len: usize,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Scratch buffer allocation failed
    #[error("Failed to allocate {len} byte transfer buffer")]
    Allocation {
        /// Requested buffer size
        len: usize,
    },

    /// Opening the bus endpoint failed
    #[error("Failed to open {path}: {source}")]
    Open {
        /// Device path
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// One of the bus configuration calls failed
    #[error("Failed to {step}: {source}")]
    Configure {
        /// The configuration step that failed
        step: ConfigStep,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The segmentation loop ended with bytes left over
    #[error("Transfer ended with {remaining} bytes outstanding")]
    Incomplete {
        /// Bytes that were never transferred
        remaining: usize,
    },
}

impl Error {
    /// Negative status code identifying the failure cause
    ///
    /// Useful when bridging to C-style callers that only see an integer.
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidArgument(InvalidArgument::EmptyWrite) => -1,
            Self::InvalidArgument(InvalidArgument::EmptyRead) => -2,
            Self::NotInitialized => -3,
            Self::ChipSelect(_) => -4,
            Self::Transfer { .. } => -5,
            Self::Allocation { .. } => -6,
            Self::Open { .. } => -7,
            Self::Configure { step, .. } => match step {
                ConfigStep::WriteMode => -8,
                ConfigStep::ReadMode => -9,
                ConfigStep::WriteSpeed => -10,
                ConfigStep::ReadSpeed => -11,
                ConfigStep::WriteBitsPerWord => -12,
                ConfigStep::ReadBitsPerWord => -13,
            },
            Self::Incomplete { .. } => -14,
        }
    }
}

/// Result type alias using the core Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct_and_negative() {
        let io = || std::io::Error::from_raw_os_error(5);
        let errors = [
            Error::InvalidArgument(InvalidArgument::EmptyWrite),
            Error::InvalidArgument(InvalidArgument::EmptyRead),
            Error::NotInitialized,
            Error::ChipSelect("gpio".into()),
            Error::Transfer {
                offset: 0,
                len: 1,
                source: io(),
            },
            Error::Allocation { len: 1 },
            Error::Open {
                path: "/dev/null".into(),
                source: io(),
            },
            Error::Configure {
                step: ConfigStep::WriteMode,
                source: io(),
            },
            Error::Configure {
                step: ConfigStep::ReadBitsPerWord,
                source: io(),
            },
            Error::Incomplete { remaining: 1 },
        ];

        let mut codes: Vec<i32> = errors.iter().map(Error::code).collect();
        assert!(codes.iter().all(|&c| c < 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_configure_message_names_step() {
        let err = Error::Configure {
            step: ConfigStep::WriteSpeed,
            source: std::io::Error::from_raw_os_error(22),
        };
        assert!(err.to_string().starts_with("Failed to set max speed"));
    }
}
