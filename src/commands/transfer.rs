//! Write, read and full-duplex transfer commands

use crate::programmers::{self, DeviceOperation};
use spixfer_core::{SpiBus, SpiDevice};

use super::hex::format_hex_dump;

/// One transfer requested on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Send `data`, optionally preceded by a register address
    Write { reg: Option<u8>, data: Vec<u8> },
    /// Receive `len` bytes
    Read { reg: Option<u8>, len: usize },
    /// Send `data` while receiving `len` bytes
    Transfer {
        reg: Option<u8>,
        data: Vec<u8>,
        len: usize,
    },
}

impl Operation {
    /// Run against `device`, returning received bytes for reads
    pub fn execute<B: SpiBus>(&self, device: &SpiDevice<B>) -> spixfer_core::Result<Option<Vec<u8>>> {
        match self {
            Self::Write { reg, data } => {
                match reg {
                    Some(addr) => device.write_reg(*addr, data)?,
                    None => device.write(data)?,
                }
                log::info!("Wrote {} bytes", data.len());
                Ok(None)
            }
            Self::Read { reg, len } => {
                let mut buf = vec![0u8; *len];
                match reg {
                    Some(addr) => device.read_reg(*addr, &mut buf)?,
                    None => device.read(&mut buf)?,
                }
                Ok(Some(buf))
            }
            Self::Transfer { reg, data, len } => {
                let mut buf = vec![0u8; *len];
                match reg {
                    Some(addr) => device.write_read_reg(*addr, data, &mut buf)?,
                    None => device.write_read(data, &mut buf)?,
                }
                Ok(Some(buf))
            }
        }
    }
}

impl DeviceOperation for &Operation {
    fn run<B: SpiBus>(self, device: &SpiDevice<B>) -> Result<(), Box<dyn std::error::Error>> {
        let received = self.execute(device).inspect_err(|e| {
            log::debug!("Transfer failed with code {}", e.code());
        })?;

        if let Some(data) = received {
            print!("{}", format_hex_dump(&data));
        }
        Ok(())
    }
}

/// Open `programmer` and run `op` on it
pub fn run_operation(
    programmer: &str,
    chunk: Option<usize>,
    op: &Operation,
) -> Result<(), Box<dyn std::error::Error>> {
    programmers::with_device(programmer, chunk, op)
}
