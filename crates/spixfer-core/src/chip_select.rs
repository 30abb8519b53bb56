//! External chip-select control
//!
//! When a device has a [`ChipSelect`] installed, the transfer engine asserts
//! it once before the first segment of a logical operation and de-asserts it
//! once after the last one. Without one, the bus driver's own per-call chip
//! select is used, which releases CS between chunks. Some peripherals need CS
//! held across the whole operation and will misbehave in that case.

/// Boxed error type returned by chip-select implementations
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Chip-select line driven outside of the SPI controller
pub trait ChipSelect: Send {
    /// Assert (`enable = true`) or release (`enable = false`) chip select
    fn set(&mut self, enable: bool) -> Result<(), BoxError>;
}

impl<F, E> ChipSelect for F
where
    F: FnMut(bool) -> Result<(), E> + Send,
    E: Into<BoxError>,
{
    fn set(&mut self, enable: bool) -> Result<(), BoxError> {
        self(enable).map_err(Into::into)
    }
}
