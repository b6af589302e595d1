//! spinor-core - SPI NOR flash driver core
//!
//! Byte- and page-level read/write/erase access to a 25-series NOR serial
//! flash chip over an exclusive SPI bus, plus power-state and
//! identification control. The driver owns the chip-select line, frames
//! every command itself, implements the write-enable-latch protocol for
//! modifying commands, and synchronizes on the device's BUSY status bit.
//! `no_std`, fully synchronous, allocation-free.
//!
//! The bus is consumed through the `embedded-hal` 1.x traits: an exclusive
//! [`SpiBus`](embedded_hal::spi::SpiBus), an
//! [`OutputPin`](embedded_hal::digital::OutputPin) for chip select, and a
//! [`DelayNs`](embedded_hal::delay::DelayNs) for the settle delays that
//! power-state transitions need.
//!
//! # Example
//!
//! ```ignore
//! use spinor_core::SpiFlash;
//!
//! // spi, cs, delay come from the target HAL
//! let mut flash = SpiFlash::new(spi, cs, delay, Some(0xEF30));
//! flash.initialize()?;
//!
//! flash.block_erase_4k(0x1000)?;
//! flash.write_bytes(0x1000, b"hello")?;
//!
//! let mut buf = [0u8; 5];
//! flash.read_bytes(0x1000, &mut buf)?;
//! assert_eq!(&buf, b"hello");
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod bus;
pub mod error;
pub mod flash;
pub mod spi;
pub mod status;

pub use error::Error;
pub use flash::{InitState, SpiFlash, PAGE_SIZE};
pub use status::Status;
