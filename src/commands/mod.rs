//! CLI command implementations
//!
//! Transfer commands are expressed as an [`Operation`] that runs against
//! whatever device the programmer string opens, so the same code path drives
//! the dummy emulator and a real spidev node.

mod hex;
mod list;
mod transfer;

pub use hex::parse_hex_bytes;
pub use list::list_programmers;
pub use transfer::{run_operation, Operation};
