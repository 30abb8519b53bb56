//! Programmer registration and dispatch
//!
//! This module provides a centralized registry for all programmers, with support
//! for feature-gated inclusion and dynamic help text generation.

use spixfer_core::{SpiBus, SpiDevice};

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &[],
        description: "Emulated register device for testing (who_am_i=<hex>,cs=<0|1>)",
    });

    #[cfg(feature = "linux-spi")]
    programmers.push(ProgrammerInfo {
        name: "linux_spi",
        aliases: &["linux-spi", "spidev"],
        description: "Linux spidev interface (dev=/dev/spidevX.Y,spispeed=<kHz>,mode=<0-3>)",
    });

    programmers
}

/// Generate help text listing all available programmers
pub fn programmer_help() -> String {
    let programmers = available_programmers();

    if programmers.is_empty() {
        return "No programmers available (recompile with programmer features enabled)".to_string();
    }

    let mut help = String::from("Available programmers:\n");

    for p in &programmers {
        help.push_str(&format!("  {:12} - {}\n", p.name, p.description));
        if !p.aliases.is_empty() {
            help.push_str(&format!("  {:12}   aliases: {}\n", "", p.aliases.join(", ")));
        }
    }

    help
}

/// Generate a short list of programmer names for CLI help
pub fn programmer_names_short() -> String {
    let programmers = available_programmers();
    let names: Vec<&str> = programmers.iter().map(|p| p.name).collect();
    names.join(", ")
}

/// Resolve a programmer name or alias to its primary name
pub fn find_programmer(name: &str) -> Option<&'static str> {
    available_programmers()
        .into_iter()
        .find(|p| p.name == name || p.aliases.contains(&name))
        .map(|p| p.name)
}

/// Operation run against whichever device a programmer string opens
///
/// The bus type differs per programmer, so the callback is a trait with a
/// generic method rather than a closure.
pub trait DeviceOperation {
    /// Run on an opened device
    fn run<B: SpiBus>(self, device: &SpiDevice<B>) -> Result<(), Box<dyn std::error::Error>>;
}

/// Open the programmer named by `programmer` and run `op` on it
///
/// `chunk` overrides the chunk size the programmer picked.
pub fn with_device<O: DeviceOperation>(
    programmer: &str,
    chunk: Option<usize>,
    op: O,
) -> Result<(), Box<dyn std::error::Error>> {
    let (name, options) = parse_programmer_string(programmer);

    let Some(canonical) = find_programmer(name) else {
        return Err(unknown_programmer_error(name));
    };

    match canonical {
        #[cfg(feature = "dummy")]
        "dummy" => {
            log::info!("Opening dummy programmer...");
            let device = open_dummy(&options)?;
            apply_chunk(&device, chunk);
            op.run(&device)
        }

        #[cfg(feature = "linux-spi")]
        "linux_spi" => {
            log::info!("Opening Linux SPI programmer...");
            let device = spixfer_linux::open_linux_spi(&options).map_err(|e| {
                format!(
                    "Failed to open Linux SPI device: {}\n\
                     Make sure the spidev module is loaded and you have access to the device.",
                    e
                )
            })?;
            apply_chunk(&device, chunk);
            op.run(&device)
        }

        _ => Err(unknown_programmer_error(name)),
    }
}

fn apply_chunk<B>(device: &SpiDevice<B>, chunk: Option<usize>) {
    if let Some(size) = chunk {
        device.set_max_chunk_size(size);
    }
    log::debug!("Using chunk size {}", device.max_chunk_size());
}

/// Open the emulated register device
///
/// # Options
///
/// - `who_am_i=0x33` - Optional: identification register value
/// - `cs=0` - Optional: let every native call be its own frame
#[cfg(feature = "dummy")]
fn open_dummy(
    options: &[(&str, &str)],
) -> Result<SpiDevice<spixfer_dummy::DummyBus>, Box<dyn std::error::Error>> {
    let mut config = spixfer_dummy::DummyConfig::default();
    let mut hold_cs = true;

    for (key, value) in options {
        match *key {
            "who_am_i" => {
                let digits = value.trim_start_matches("0x").trim_start_matches("0X");
                config.who_am_i = u8::from_str_radix(digits, 16)
                    .map_err(|_| format!("Invalid who_am_i value: {}", value))?;
            }
            "cs" => {
                hold_cs = !matches!(*value, "0" | "false" | "no");
            }
            _ => {
                log::warn!("dummy: Unknown option: {}={}", key, value);
            }
        }
    }

    let bus = spixfer_dummy::DummyBus::new(config);
    let chip_select = bus.chip_select();
    let device = SpiDevice::with_bus(bus);
    if hold_cs {
        device.set_chip_select(Some(Box::new(chip_select)));
    }
    Ok(device)
}

/// Parse a programmer string into name and options
///
/// Format: `name` or `name:key=value,key=value`
pub fn parse_programmer_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    let Some((name, rest)) = s.split_once(':') else {
        return (s, Vec::new());
    };

    let options = rest
        .split(',')
        .filter(|opt| !opt.is_empty())
        .map(|opt| opt.split_once('=').unwrap_or((opt, "")))
        .collect();

    (name, options)
}

fn unknown_programmer_error(name: &str) -> Box<dyn std::error::Error> {
    let available = programmer_names_short();
    if available.is_empty() {
        format!(
            "Unknown programmer: '{}'. No programmers are enabled in this build.",
            name
        )
        .into()
    } else {
        format!(
            "Unknown programmer: '{}'. Available programmers: {}",
            name, available
        )
        .into()
    }
}
