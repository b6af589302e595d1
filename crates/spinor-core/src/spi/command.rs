//! SPI command structure

/// A single framed SPI transaction
///
/// Designed to avoid allocation - uses slices for data. The lifetime
/// parameter `'a` ties the command to the buffers it references.
///
/// On the wire a command is: opcode, optional 3-byte big-endian address,
/// `dummy_bytes` zero bytes, the write payload, then `read_buf.len()` bytes
/// clocked back in, all under one chip-select assertion.
pub struct SpiCommand<'a> {
    /// The opcode byte
    pub opcode: u8,

    /// Address (if any), low 24 bits significant
    pub address: Option<u32>,

    /// Number of dummy bytes clocked out after the address
    pub dummy_bytes: u8,

    /// Data to write after opcode/address/dummy
    pub write_data: &'a [u8],

    /// Buffer to read into (mutable)
    pub read_buf: &'a mut [u8],

    /// Microseconds to settle after chip-select release. Only power-state
    /// transitions need this; their readiness is not visible in the status
    /// register.
    pub settle_us: u32,
}

impl<'a> SpiCommand<'a> {
    /// Create a simple command with no address or data (e.g., WREN, DP)
    pub fn simple(opcode: u8) -> Self {
        Self {
            opcode,
            address: None,
            dummy_bytes: 0,
            write_data: &[],
            read_buf: &mut [],
            settle_us: 0,
        }
    }

    /// Create a read register command with no address (e.g., RDSR, RDID)
    pub fn read_reg(opcode: u8, buf: &'a mut [u8]) -> Self {
        Self {
            opcode,
            address: None,
            dummy_bytes: 0,
            write_data: &[],
            read_buf: buf,
            settle_us: 0,
        }
    }

    /// Create a write register command with no address (e.g., WRSR)
    pub fn write_reg(opcode: u8, data: &'a [u8]) -> Self {
        Self {
            opcode,
            address: None,
            dummy_bytes: 0,
            write_data: data,
            read_buf: &mut [],
            settle_us: 0,
        }
    }

    /// Create an addressed read command (e.g., READ)
    pub fn read(opcode: u8, addr: u32, buf: &'a mut [u8]) -> Self {
        Self {
            opcode,
            address: Some(addr),
            dummy_bytes: 0,
            write_data: &[],
            read_buf: buf,
            settle_us: 0,
        }
    }

    /// Create an addressed write command (e.g., PP)
    pub fn write(opcode: u8, addr: u32, data: &'a [u8]) -> Self {
        Self {
            opcode,
            address: Some(addr),
            dummy_bytes: 0,
            write_data: data,
            read_buf: &mut [],
            settle_us: 0,
        }
    }

    /// Create an erase command: address only, no payload
    pub fn erase(opcode: u8, addr: u32) -> Self {
        Self {
            opcode,
            address: Some(addr),
            dummy_bytes: 0,
            write_data: &[],
            read_buf: &mut [],
            settle_us: 0,
        }
    }

    /// Set the number of dummy bytes
    pub fn with_dummy_bytes(mut self, bytes: u8) -> Self {
        self.dummy_bytes = bytes;
        self
    }

    /// Set the post-release settle delay
    pub fn with_settle_us(mut self, us: u32) -> Self {
        self.settle_us = us;
        self
    }

    /// Returns true if this command has a read phase
    pub fn has_read(&self) -> bool {
        !self.read_buf.is_empty()
    }

    /// Returns true if this command has a write phase
    pub fn has_write(&self) -> bool {
        !self.write_data.is_empty()
    }

    /// Returns true if this command has an address phase
    pub fn has_address(&self) -> bool {
        self.address.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spi::opcodes;

    #[test]
    fn simple_has_no_phases() {
        let cmd = SpiCommand::simple(opcodes::WREN);
        assert_eq!(cmd.opcode, opcodes::WREN);
        assert!(!cmd.has_address());
        assert!(!cmd.has_read());
        assert!(!cmd.has_write());
        assert_eq!(cmd.settle_us, 0);
    }

    #[test]
    fn read_carries_address_and_buffer() {
        let mut buf = [0u8; 4];
        let cmd = SpiCommand::read(opcodes::READ, 0x1234, &mut buf);
        assert_eq!(cmd.address, Some(0x1234));
        assert!(cmd.has_read());
        assert!(!cmd.has_write());
    }

    #[test]
    fn builders_set_dummy_and_settle() {
        let mut buf = [0u8; 8];
        let cmd = SpiCommand::read_reg(opcodes::RDUID, &mut buf).with_dummy_bytes(4);
        assert_eq!(cmd.dummy_bytes, 4);

        let cmd = SpiCommand::simple(opcodes::RDP).with_settle_us(3);
        assert_eq!(cmd.settle_us, 3);
    }
}
