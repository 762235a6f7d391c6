use std::fmt;

/// Byte position in a transaction, reported when the slave does not acknowledge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Address byte with the write bit.
    Address,
    /// Register pointer byte.
    Register,
    /// Register value byte.
    Data,
    /// Address byte with the read bit, after the repeated start.
    ReadAddress,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Phase::Address => write!(f, "address"),
            Phase::Register => write!(f, "register"),
            Phase::Data => write!(f, "data"),
            Phase::ReadAddress => write!(f, "read address"),
        }
    }
}

/// Errors from the bus engine and the sensor driver.
///
/// `E` is the error type of the GPIO lines.
#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    /// A GPIO line operation failed.
    #[error("gpio line error: {0:?}")]
    Gpio(E),
    /// The slave did not acknowledge a byte.
    #[error("no acknowledge for {0} byte")]
    Nack(Phase),
    /// Calibration was never loaded or the last load failed.
    #[error("calibration not loaded")]
    NotReady,
    /// The chip ID register holds an unexpected value.
    #[error("unexpected chip id {found:#04x}, expected {expected:#04x}")]
    ChipId { found: u8, expected: u8 },
}

impl<E> Error<E> {
    /// `true` for bus-level failures, which trigger recovery.
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Gpio(_) | Error::Nack(_))
    }
}

pub type Result<T, E> = core::result::Result<T, Error<E>>;
