//! Error types
//!
//! The driver propagates bus and chip-select failures from the transport
//! seam and adds its own protocol errors on top. `S` is the SPI bus error
//! type, `P` the chip-select pin error type.

use core::fmt::{self, Debug};

/// The error type used by this library.
pub enum Error<S, P> {
    /// An SPI transfer failed.
    Spi(S),
    /// Driving the chip-select line failed.
    Pin(P),
    /// The JEDEC device ID read at initialization does not match the one
    /// the handle was constructed with.
    JedecIdMismatch {
        /// The identity code the handle expects.
        expected: u16,
        /// The identity code the chip reported.
        found: u16,
    },
    /// A page program payload was empty or longer than one page.
    InvalidDataLength,
    /// A page program range would cross a 256-byte page boundary. The
    /// device would wrap within the page and corrupt unintended bytes.
    DataCrossesPageBoundary,
}

impl<S: Debug, P: Debug> Debug for Error<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Spi(e) => write!(f, "Error::Spi({:?})", e),
            Error::Pin(e) => write!(f, "Error::Pin({:?})", e),
            Error::JedecIdMismatch { expected, found } => {
                write!(
                    f,
                    "Error::JedecIdMismatch {{ expected: {:#06X}, found: {:#06X} }}",
                    expected, found
                )
            }
            Error::InvalidDataLength => write!(f, "Error::InvalidDataLength"),
            Error::DataCrossesPageBoundary => write!(f, "Error::DataCrossesPageBoundary"),
        }
    }
}

impl<S: Debug, P: Debug> fmt::Display for Error<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Spi(e) => write!(f, "SPI transfer failed: {:?}", e),
            Error::Pin(e) => write!(f, "chip select failed: {:?}", e),
            Error::JedecIdMismatch { expected, found } => {
                write!(
                    f,
                    "JEDEC ID mismatch: expected {:#06X}, found {:#06X}",
                    expected, found
                )
            }
            Error::InvalidDataLength => {
                write!(f, "page program payload must be 1..=256 bytes")
            }
            Error::DataCrossesPageBoundary => {
                write!(f, "page program range crosses a page boundary")
            }
        }
    }
}
