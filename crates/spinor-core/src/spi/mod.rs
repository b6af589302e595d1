//! SPI types and command structures
//!
//! This module provides the wire-level vocabulary of the driver: standard
//! opcodes, 24-bit address encoding, and the framed command structure.

pub mod address;
mod command;
pub mod opcodes;

pub use command::SpiCommand;
