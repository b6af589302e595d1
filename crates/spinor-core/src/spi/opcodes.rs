//! Serial flash command opcodes
//!
//! The standard 25-series command set this driver issues, as specified by
//! JEDEC and common manufacturer datasheets. All commands are a single
//! opcode byte; commands that address the array carry a 3-byte big-endian
//! address after the opcode.

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - sets the WEL latch, required before any modifying command
pub const WREN: u8 = 0x06;
/// Write Disable - clears the WEL latch
pub const WRDI: u8 = 0x04;

// ============================================================================
// Status register operations
// ============================================================================

/// Read Status Register
pub const RDSR: u8 = 0x05;
/// Write Status Register (1 data byte)
pub const WRSR: u8 = 0x01;

// ============================================================================
// Identification
// ============================================================================

/// Read JEDEC ID (manufacturer + device ID, 2 bytes)
pub const RDID: u8 = 0x9F;
/// Read Unique ID (4 dummy bytes, then 8 ID bytes)
pub const RDUID: u8 = 0x4B;

// ============================================================================
// Array read
// ============================================================================

/// Read Data (low frequency, no dummy byte)
pub const READ: u8 = 0x03;
/// Fast Read (1 dummy byte after the address, up to max frequency)
pub const FAST_READ: u8 = 0x0B;

// ============================================================================
// Page Program
// ============================================================================

/// Page Program (1..=256 data bytes within one page)
pub const PP: u8 = 0x02;

// ============================================================================
// Erase commands
// ============================================================================

/// Sector Erase 4KB
pub const SE_20: u8 = 0x20;
/// Block Erase 32KB
pub const BE_52: u8 = 0x52;
/// Block Erase 64KB
pub const BE_D8: u8 = 0xD8;
/// Chip Erase (entire chip, may take seconds)
pub const CE_60: u8 = 0x60;

// ============================================================================
// Power management
// ============================================================================

/// Deep Power Down
pub const DP: u8 = 0xB9;
/// Release from Deep Power Down (needs a settle delay afterwards)
pub const RDP: u8 = 0xAB;
