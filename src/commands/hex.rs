//! Hex input and output helpers

use thiserror::Error;

/// Errors from parsing hex byte arguments
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HexError {
    /// An argument had an odd number of digits
    #[error("Odd number of hex digits in '{0}'")]
    OddLength(String),
    /// An argument contained a non-hex character
    #[error("Invalid hex digits in '{0}'")]
    InvalidDigit(String),
}

/// Parse arguments like `de ad`, `0xdead` or `de:ad` into bytes
pub fn parse_hex_bytes<S: AsRef<str>>(args: &[S]) -> Result<Vec<u8>, HexError> {
    let mut bytes = Vec::new();

    for arg in args {
        let arg = arg.as_ref();
        let digits: String = arg
            .trim_start_matches("0x")
            .trim_start_matches("0X")
            .chars()
            .filter(|c| !matches!(c, ':' | '_' | ' '))
            .collect();

        if digits.len() % 2 != 0 {
            return Err(HexError::OddLength(arg.to_string()));
        }

        for pair in digits.as_bytes().chunks(2) {
            let pair = std::str::from_utf8(pair).map_err(|_| HexError::InvalidDigit(arg.to_string()))?;
            let byte =
                u8::from_str_radix(pair, 16).map_err(|_| HexError::InvalidDigit(arg.to_string()))?;
            bytes.push(byte);
        }
    }

    Ok(bytes)
}

/// Format bytes as offset-prefixed lines of 16
pub fn format_hex_dump(data: &[u8]) -> String {
    let mut out = String::new();

    for (line, chunk) in data.chunks(16).enumerate() {
        out.push_str(&format!("{:04x}:", line * 16));
        for byte in chunk {
            out.push_str(&format!(" {:02x}", byte));
        }
        out.push('\n');
    }

    out
}
