//! Linux spidev bus implementation
//!
//! This module provides the `Spidev` struct that implements the `SpiBus`
//! and `OpenBus` traits using Linux's `/dev/spidevX.Y` interface.

use spixfer_core::{ConfigStep, Error, OpenBus, Result, SpiBus, SpiConfig, Transfer};

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;

/// Path to kernel spidev buffer size parameter
const BUF_SIZE_SYSFS: &str = "/sys/module/spidev/parameters/bufsiz";

/// Linux spidev ioctl constants
mod ioctl {
    use nix::ioctl_read;
    use nix::ioctl_write_ptr;

    // SPI ioctl magic number
    const SPI_IOC_MAGIC: u8 = b'k';

    // SPI ioctl type numbers
    const SPI_IOC_TYPE_MODE: u8 = 1;
    const SPI_IOC_TYPE_BITS_PER_WORD: u8 = 3;
    const SPI_IOC_TYPE_MAX_SPEED_HZ: u8 = 4;

    ioctl_read!(spi_ioc_rd_mode, SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE, u8);
    ioctl_write_ptr!(spi_ioc_wr_mode, SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE, u8);
    ioctl_read!(
        spi_ioc_rd_bits_per_word,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_BITS_PER_WORD,
        u8
    );
    ioctl_write_ptr!(
        spi_ioc_wr_bits_per_word,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_BITS_PER_WORD,
        u8
    );
    ioctl_read!(
        spi_ioc_rd_max_speed_hz,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_MAX_SPEED_HZ,
        u32
    );
    ioctl_write_ptr!(
        spi_ioc_wr_max_speed_hz,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_MAX_SPEED_HZ,
        u32
    );

    /// Size of struct spi_ioc_transfer (identical on 32- and 64-bit)
    pub const SPI_IOC_TRANSFER_SIZE: usize = 32;

    /// Calculate ioctl number for SPI_IOC_MESSAGE(n)
    ///
    /// SPI_IOC_MESSAGE(n) = _IOW(SPI_IOC_MAGIC, 0, char[n * sizeof(spi_ioc_transfer)])
    pub fn spi_ioc_message(n: u8) -> libc::c_ulong {
        let size = (n as usize) * SPI_IOC_TRANSFER_SIZE;
        // _IOC(dir, type, nr, size) = ((dir)<<30)|((size)<<16)|((type)<<8)|(nr)
        // with _IOC_WRITE = 1
        ((1u32 << 30) | ((size as u32) << 16) | ((SPI_IOC_MAGIC as u32) << 8)) as libc::c_ulong
    }
}

/// SPI transfer structure for ioctl
/// This must match the kernel's struct spi_ioc_transfer layout
#[repr(C)]
#[derive(Debug, Default, Clone)]
struct SpiIocTransfer {
    tx_buf: u64,          // __u64 tx_buf
    rx_buf: u64,          // __u64 rx_buf
    len: u32,             // __u32 len
    speed_hz: u32,        // __u32 speed_hz
    delay_usecs: u16,     // __u16 delay_usecs
    bits_per_word: u8,    // __u8 bits_per_word
    cs_change: u8,        // __u8 cs_change
    tx_nbits: u8,         // __u8 tx_nbits
    rx_nbits: u8,         // __u8 rx_nbits
    word_delay_usecs: u8, // __u8 word_delay_usecs
    _pad: u8,             // padding
}

fn os_error(e: nix::Error) -> std::io::Error {
    std::io::Error::from_raw_os_error(e as i32)
}

fn config_error(step: ConfigStep) -> impl FnOnce(nix::Error) -> Error {
    move |e| Error::Configure {
        step,
        source: os_error(e),
    }
}

/// Open spidev endpoint
///
/// Dropping it closes the file descriptor.
pub struct Spidev {
    /// File handle for spidev device
    file: File,
    /// Speed read back from the driver, stamped on every descriptor
    speed_hz: u32,
    /// Word size read back from the driver
    bits_per_word: u8,
}

impl OpenBus for Spidev {
    fn open(config: &SpiConfig) -> Result<Self> {
        log::debug!("linux_spi: Opening device {}", config.device);

        // Dropping `file` on any error below closes the descriptor again
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.device)
            .map_err(|e| Error::Open {
                path: config.device.clone(),
                source: e,
            })?;

        let fd = file.as_raw_fd();

        let mode = config.mode.bits();
        let mut rd_mode: u8 = 0;
        unsafe {
            ioctl::spi_ioc_wr_mode(fd, &mode).map_err(config_error(ConfigStep::WriteMode))?;
            ioctl::spi_ioc_rd_mode(fd, &mut rd_mode).map_err(config_error(ConfigStep::ReadMode))?;
        }
        if rd_mode & 0x03 != mode {
            log::warn!(
                "linux_spi: Requested mode {} but driver reports {}",
                mode,
                rd_mode & 0x03
            );
        }

        let speed = config.speed_hz;
        let mut rd_speed: u32 = 0;
        unsafe {
            ioctl::spi_ioc_wr_max_speed_hz(fd, &speed)
                .map_err(config_error(ConfigStep::WriteSpeed))?;
            ioctl::spi_ioc_rd_max_speed_hz(fd, &mut rd_speed)
                .map_err(config_error(ConfigStep::ReadSpeed))?;
        }

        let bits = config.bits_per_word;
        let mut rd_bits: u8 = 0;
        unsafe {
            ioctl::spi_ioc_wr_bits_per_word(fd, &bits)
                .map_err(config_error(ConfigStep::WriteBitsPerWord))?;
            ioctl::spi_ioc_rd_bits_per_word(fd, &mut rd_bits)
                .map_err(config_error(ConfigStep::ReadBitsPerWord))?;
        }

        log::info!(
            "linux_spi: Opened {} (mode={}, speed={} kHz, bits={})",
            config.device,
            config.mode,
            rd_speed / 1000,
            rd_bits
        );

        Ok(Self {
            file,
            speed_hz: rd_speed,
            bits_per_word: rd_bits,
        })
    }
}

impl SpiBus for Spidev {
    fn transfer(&mut self, transfers: &mut [Transfer<'_>]) -> std::io::Result<()> {
        let count = u8::try_from(transfers.len())
            .map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidInput))?;

        let mut descriptors = Vec::with_capacity(transfers.len());
        for t in transfers.iter_mut() {
            let len = u32::try_from(t.len)
                .map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidInput))?;
            if t.tx.is_some_and(|b| b.len() < t.len) || t.rx.as_ref().is_some_and(|b| b.len() < t.len)
            {
                return Err(std::io::Error::from(std::io::ErrorKind::InvalidInput));
            }

            descriptors.push(SpiIocTransfer {
                tx_buf: t.tx.map_or(0, |b| b.as_ptr() as u64),
                rx_buf: t.rx.as_deref_mut().map_or(0, |b| b.as_mut_ptr() as u64),
                len,
                speed_hz: self.speed_hz,
                bits_per_word: self.bits_per_word,
                cs_change: t.cs_change as u8,
                ..Default::default()
            });
        }

        // Buffers stay borrowed through `transfers` for the duration of the call
        let ret = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                ioctl::spi_ioc_message(count),
                descriptors.as_ptr(),
            )
        };

        if ret < 0 {
            return Err(std::io::Error::last_os_error());
        }

        Ok(())
    }
}

/// Read the maximum kernel buffer size from sysfs, or use page size as fallback
///
/// A single spidev message (address byte included) may not exceed this.
pub fn kernel_buf_size() -> usize {
    if let Ok(content) = std::fs::read_to_string(BUF_SIZE_SYSFS) {
        if let Ok(size) = content.trim().parse::<usize>() {
            if size > 0 {
                log::debug!("linux_spi: Using buffer size {} from sysfs", size);
                return size;
            }
        }
        log::warn!("linux_spi: Invalid buffer size in {}", BUF_SIZE_SYSFS);
    } else {
        log::debug!("linux_spi: Cannot read {}, using page size", BUF_SIZE_SYSFS);
    }

    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if page_size > 0 {
        page_size as usize
    } else {
        spixfer_core::DEFAULT_MAX_CHUNK_SIZE
    }
}

/// Largest chunk size whose messages fit the kernel buffer
///
/// Leaves room for the register address byte that accompanies the first
/// chunk of addressed transfers.
pub fn recommended_chunk_size() -> usize {
    kernel_buf_size().saturating_sub(1).max(1)
}
