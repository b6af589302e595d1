//! SPI NOR flash driver
//!
//! NOR flash requires erase before write: programming can only clear bits
//! (1 -> 0) and only an erase command resets a region to all 1s. The driver
//! surfaces that asymmetry rather than hiding it, and implements the two
//! protocol obligations every modifying command carries: a separately
//! framed Write Enable immediately before it (the WEL latch auto-clears
//! when the command completes or aborts), and completion observed by
//! polling the BUSY status bit.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use crate::bus::SpiInterface;
use crate::error::Error;
use crate::spi::{opcodes, SpiCommand};
use crate::status::Status;

/// Smallest programmable unit in bytes. A page program payload must stay
/// within one page; the device wraps within the page on overflow.
pub const PAGE_SIZE: usize = 256;

/// Settle time after releasing the chip from deep power-down, in
/// microseconds. Readiness after wake is not observable in the status
/// register.
const WAKE_SETTLE_US: u32 = 3;

/// Dummy bytes between the unique-ID opcode and the ID stream.
const UNIQUE_ID_DUMMY_BYTES: u8 = 4;

/// Dummy bytes between the fast-read address and the data stream.
const FAST_READ_DUMMY_BYTES: u8 = 1;

/// Initialization state of a driver handle.
///
/// [`SpiFlash::initialize`] is the only transition into `Ready`. Every
/// data-path, status, and power operation is undefined before that
/// transition succeeds; the driver does not check at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitState {
    /// No identification attempt has been made yet.
    #[default]
    Uninitialized,
    /// The chip answered identification (and matched the expected JEDEC ID
    /// when one was supplied).
    Ready,
    /// An expected JEDEC ID was supplied and the chip reported a different
    /// one. The handle holds no partial state; `initialize` may be retried
    /// by the caller.
    Failed,
}

/// Driver handle for one NOR serial flash chip.
///
/// Owns the bus, the chip-select line, and the delay primitive for the
/// lifetime of the handle; [`release`](Self::release) gives them back.
/// A handle never shares its bus: callers running several chips on one
/// physical bus must serialize access externally.
pub struct SpiFlash<SPI, CS, D> {
    bus: SpiInterface<SPI, CS, D>,
    expected_id: Option<u16>,
    state: InitState,
}

impl<SPI, CS, D> SpiFlash<SPI, CS, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    D: DelayNs,
{
    /// Create a handle for the chip behind `cs`.
    ///
    /// `expected_id` is the 16-bit JEDEC identity code [`initialize`]
    /// verifies; pass `None` to skip the check.
    ///
    /// [`initialize`]: Self::initialize
    pub fn new(spi: SPI, cs: CS, delay: D, expected_id: Option<u16>) -> Self {
        Self {
            bus: SpiInterface::new(spi, cs, delay),
            expected_id,
            state: InitState::Uninitialized,
        }
    }

    /// Current initialization state.
    pub fn state(&self) -> InitState {
        self.state
    }

    /// Identify the chip and bring the handle to [`InitState::Ready`].
    ///
    /// Deasserts the chip-select line, reads the JEDEC device ID, and
    /// compares it against the expected identity code when one was
    /// supplied. On a mismatch the handle moves to [`InitState::Failed`]
    /// and no further bus operation is attempted; there is no automatic
    /// retry.
    pub fn initialize(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.bus.deselect()?;
        let found = self.read_device_id()?;
        log::debug!("JEDEC device ID: {:#06X}", found);

        if let Some(expected) = self.expected_id {
            if found != expected {
                log::error!(
                    "JEDEC ID mismatch: expected {:#06X}, found {:#06X}",
                    expected,
                    found
                );
                self.state = InitState::Failed;
                return Err(Error::JedecIdMismatch { expected, found });
            }
        }

        self.state = InitState::Ready;
        Ok(())
    }

    /// Tear down the handle and recover the bus, chip-select pin, and
    /// delay provider.
    pub fn release(self) -> (SPI, CS, D) {
        self.bus.release()
    }

    // ========================================================================
    // Command dispatch
    // ========================================================================

    /// Issue a bare opcode.
    ///
    /// With `is_write`, a Write Enable transmission is framed separately
    /// first, satisfying the latch-before-modify rule. With `busy_wait`,
    /// the status register is polled until BUSY clears before returning,
    /// so the device is idle and safe for a subsequent command; otherwise
    /// the call returns right after transmission and the caller must poll
    /// [`busy`](Self::busy) itself, notably after chip erase.
    pub fn command(
        &mut self,
        opcode: u8,
        is_write: bool,
        busy_wait: bool,
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.run(SpiCommand::simple(opcode), is_write, busy_wait)
    }

    /// Dispatch one command with the latch and busy-poll protocol around it.
    fn run(
        &mut self,
        mut cmd: SpiCommand<'_>,
        is_write: bool,
        busy_wait: bool,
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        if is_write {
            // own frame: the latch is sampled on chip-select release
            self.write_enable()?;
        }
        self.bus.execute(&mut cmd)?;
        if busy_wait {
            self.wait_ready()?;
        }
        Ok(())
    }

    fn write_enable(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.bus.execute(&mut SpiCommand::simple(opcodes::WREN))
    }

    /// Spin on the status register until BUSY clears.
    fn wait_ready(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        while self.read_status()?.contains(Status::BUSY) {}
        Ok(())
    }

    // ========================================================================
    // Status and identity
    // ========================================================================

    /// Read the status register.
    ///
    /// Returns the raw 8-bit register; nothing is interpreted or cached.
    pub fn read_status(&mut self) -> Result<Status, Error<SPI::Error, CS::Error>> {
        let mut buf = [0u8; 1];
        self.bus
            .execute(&mut SpiCommand::read_reg(opcodes::RDSR, &mut buf))?;
        Ok(Status::from_bits_retain(buf[0]))
    }

    /// Whether the device is executing an internal operation.
    pub fn busy(&mut self) -> Result<bool, Error<SPI::Error, CS::Error>> {
        Ok(self.read_status()?.contains(Status::BUSY))
    }

    /// Read the 16-bit JEDEC identity code (manufacturer and device bytes,
    /// big-endian).
    pub fn read_device_id(&mut self) -> Result<u16, Error<SPI::Error, CS::Error>> {
        let mut buf = [0u8; 2];
        self.bus
            .execute(&mut SpiCommand::read_reg(opcodes::RDID, &mut buf))?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Read the 8-byte factory-programmed unique ID.
    ///
    /// The device requires 4 dummy bytes after the opcode before it streams
    /// the ID. Read fresh on every call.
    pub fn read_unique_id(&mut self) -> Result<[u8; 8], Error<SPI::Error, CS::Error>> {
        let mut id = [0u8; 8];
        self.bus.execute(
            &mut SpiCommand::read_reg(opcodes::RDUID, &mut id)
                .with_dummy_bytes(UNIQUE_ID_DUMMY_BYTES),
        )?;
        Ok(id)
    }

    // ========================================================================
    // Data path
    // ========================================================================

    /// Read one byte at `addr`.
    pub fn read_byte(&mut self, addr: u32) -> Result<u8, Error<SPI::Error, CS::Error>> {
        let mut buf = [0u8; 1];
        self.read_bytes(addr, &mut buf)?;
        Ok(buf[0])
    }

    /// Fill `buf` starting at `addr` in one contiguous sequential read.
    ///
    /// The bus is held for the whole stream. Length is unbounded by the
    /// protocol; the address is not validated against chip capacity.
    pub fn read_bytes(
        &mut self,
        addr: u32,
        buf: &mut [u8],
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.run(SpiCommand::read(opcodes::READ, addr, buf), false, false)
    }

    /// Like [`read_bytes`](Self::read_bytes) using the fast-read command,
    /// which clocks one dummy byte after the address and may run at the
    /// device's full clock rate.
    pub fn read_bytes_fast(
        &mut self,
        addr: u32,
        buf: &mut [u8],
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.run(
            SpiCommand::read(opcodes::FAST_READ, addr, buf)
                .with_dummy_bytes(FAST_READ_DUMMY_BYTES),
            false,
            false,
        )
    }

    /// Program one byte at `addr`. Busy-waits until the program cycle
    /// completes; the device ignores further commands mid-program.
    ///
    /// The containing page must have been erased for the byte to read back
    /// as written.
    pub fn write_byte(
        &mut self,
        addr: u32,
        value: u8,
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        let data = [value];
        self.write_bytes(addr, &data)
    }

    /// Program 1..=256 bytes in one page-program transaction. Busy-waits.
    ///
    /// The range must stay within one 256-byte page; a payload that would
    /// cross the boundary is rejected before any bus traffic, since the
    /// device would silently wrap within the page and corrupt unintended
    /// bytes.
    pub fn write_bytes(
        &mut self,
        addr: u32,
        data: &[u8],
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        check_page_range(addr, data.len())?;
        self.run(SpiCommand::write(opcodes::PP, addr, data), true, true)
    }

    /// Erase the 4 KiB block containing `addr`. Busy-waits; erase latency
    /// is milliseconds-scale.
    ///
    /// The device truncates the address to the block boundary itself.
    pub fn block_erase_4k(&mut self, addr: u32) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.erase(opcodes::SE_20, addr)
    }

    /// Erase the 32 KiB block containing `addr`. Busy-waits.
    pub fn block_erase_32k(&mut self, addr: u32) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.erase(opcodes::BE_52, addr)
    }

    /// Erase the 64 KiB block containing `addr`. Busy-waits.
    pub fn block_erase_64k(&mut self, addr: u32) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.erase(opcodes::BE_D8, addr)
    }

    fn erase(&mut self, opcode: u8, addr: u32) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.run(SpiCommand::erase(opcode, addr), true, true)
    }

    /// Erase the entire chip.
    ///
    /// Does **not** busy-wait: a full-chip erase may take seconds. The
    /// caller must poll [`busy`](Self::busy) before relying on the result
    /// or issuing another command.
    pub fn chip_erase(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.run(SpiCommand::simple(opcodes::CE_60), true, false)
    }

    /// Write the status register. A modifying command: latches WEL first
    /// and busy-waits for the write cycle.
    pub fn write_status(&mut self, value: u8) -> Result<(), Error<SPI::Error, CS::Error>> {
        let data = [value];
        self.run(SpiCommand::write_reg(opcodes::WRSR, &data), true, true)
    }

    /// Clear the write-enable latch explicitly.
    pub fn write_disable(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.command(opcodes::WRDI, false, false)
    }

    // ========================================================================
    // Power control
    // ========================================================================

    /// Enter deep power-down. No busy-wait: the device accepts no command
    /// but wake until released from power-down.
    pub fn sleep(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.run(SpiCommand::simple(opcodes::DP), false, false)
    }

    /// Release the chip from deep power-down.
    ///
    /// Holds the chip-select line released for a fixed settle time before
    /// returning; the device cannot service commands earlier and the delay
    /// is not observable through the BUSY bit.
    pub fn wakeup(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.run(
            SpiCommand::simple(opcodes::RDP).with_settle_us(WAKE_SETTLE_US),
            false,
            false,
        )
    }
}

/// Validate a page-program range: nonempty, at most one page, and entirely
/// within the page containing `addr`.
fn check_page_range<S, P>(addr: u32, len: usize) -> Result<(), Error<S, P>> {
    if len == 0 || len > PAGE_SIZE {
        return Err(Error::InvalidDataLength);
    }
    let offset = addr as usize % PAGE_SIZE;
    if offset + len > PAGE_SIZE {
        return Err(Error::DataCrossesPageBoundary);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    fn check(addr: u32, len: usize) -> Result<(), Error<Infallible, Infallible>> {
        check_page_range(addr, len)
    }

    #[test]
    fn full_page_at_boundary_is_valid() {
        assert!(check(0x000100, PAGE_SIZE).is_ok());
        assert!(check(0x000000, 1).is_ok());
        assert!(check(0x0000FF, 1).is_ok());
    }

    #[test]
    fn empty_and_oversized_payloads_are_rejected() {
        assert!(matches!(check(0, 0), Err(Error::InvalidDataLength)));
        assert!(matches!(
            check(0, PAGE_SIZE + 1),
            Err(Error::InvalidDataLength)
        ));
    }

    #[test]
    fn boundary_crossings_are_rejected() {
        assert!(matches!(
            check(0x0000FF, 2),
            Err(Error::DataCrossesPageBoundary)
        ));
        assert!(matches!(
            check(0x000101, PAGE_SIZE),
            Err(Error::DataCrossesPageBoundary)
        ));
    }
}
